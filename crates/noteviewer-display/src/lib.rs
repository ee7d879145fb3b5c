use error::Error;
use web_sys::{wasm_bindgen::JsCast, Document, HtmlElement};

pub mod controller;
pub mod dom;
pub mod error;
pub mod preview;

/// Get the page's document
pub fn document() -> Result<Document, Error> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or(Error::NoDocument)
}

/// Get an element the page provides by its id
pub fn element_by_id(document: &Document, id: &str) -> Result<HtmlElement, Error> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| Error::MissingElement(id.to_string()))?
        .dyn_into()
        .map_err(|_| Error::Dom(format!("#{} is not an html element", id)))
}
