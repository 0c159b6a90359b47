use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    #[error("Step {name} failed: {source}")]
    Step {
        name: String,
        #[source]
        source: Box<BatchError>,
    },

    /// A source file could not be turned into a table.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A table does not carry the columns its target schema requires.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Geometric failures raised while composing a paginated document.
///
/// Both variants are fatal: composition stops and no partial document is
/// returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// An image is taller than the usable height of a fresh page.
    #[error("image in section '{heading}' is {height} units tall but a page only offers {usable}")]
    ImageTooLarge {
        heading: String,
        height: f32,
        usable: f32,
    },

    /// The page leaves no room for a heading followed by one line.
    #[error("page height {height} cannot hold margins plus a heading and one line ({required} needed)")]
    InvalidPageGeometry { height: f32, required: f32 },
}
