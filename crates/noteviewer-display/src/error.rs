/// The errors for the display
#[derive(Debug)]
pub enum Error {
    NoDocument,
    MissingElement(String),
    Dom(String),
    Tree(noteviewer_tree::error::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDocument => {
                writeln!(f, "No document. The display must be set up in the main thread.")
            }
            Self::MissingElement(id) => writeln!(f, "No element with id {} on the page", id),
            Self::Dom(e) => writeln!(f, "DOM operation failed: {}", e),
            Self::Tree(e) => writeln!(f, "{}", e),
        }
    }
}

impl From<noteviewer_tree::error::Error> for Error {
    fn from(error: noteviewer_tree::error::Error) -> Self {
        Self::Tree(error)
    }
}
