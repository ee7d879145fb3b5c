//! Materialization of a [`TreeLayout`] into the sidebar's nested lists.
use noteviewer_tree::{
    error::Error as TreeError,
    layout::{DirId, FileId, Row, TreeLayout},
};
use web_sys::{wasm_bindgen::JsCast, Document, HtmlElement};

use crate::error::Error;

pub const TREE_CLASS: &str = "tree-view";
pub const DIR_ROW_CLASS: &str = "dir-row";
pub const FILE_ROW_CLASS: &str = "file-row";
pub const NESTED_CLASS: &str = "nested";
pub const EXPANDED_CLASS: &str = "active";
pub const CARET_CLASS: &str = "caret";
pub const CARET_DOWN_CLASS: &str = "caret-down";
pub const SELECTED_CLASS: &str = "selected";
pub const EMPTY_CLASS: &str = "tree-empty";

/// The elements making up one directory row
#[derive(Debug, Clone)]
pub struct DirElements {
    pub row: HtmlElement,
    pub caret: HtmlElement,
    pub nested: HtmlElement,
}

/// The mounted tree. Elements are indexed by the ids of the layout they were built from.
#[derive(Debug)]
pub struct TreeView {
    directories: Vec<DirElements>,
    files: Vec<HtmlElement>,
}

impl TreeView {
    /// Build the whole tree and append it to the container
    pub fn mount(
        document: &Document,
        container: &HtmlElement,
        layout: &TreeLayout,
    ) -> Result<Self, Error> {
        let root = create_element(document, "ul", &[TREE_CLASS])?;

        let mut directories = vec![None; layout.directory_count()];
        let mut files = vec![None; layout.file_count()];
        build_directory(
            document,
            &root,
            layout,
            TreeLayout::ROOT,
            &mut directories,
            &mut files,
        )?;

        let directories = directories
            .into_iter()
            .enumerate()
            .map(|(i, dir)| dir.ok_or(Error::Tree(TreeError::UnknownDirectory(i))))
            .collect::<Result<Vec<_>, _>>()?;
        let files = files
            .into_iter()
            .enumerate()
            .map(|(i, file)| file.ok_or(Error::Tree(TreeError::UnknownFile(i))))
            .collect::<Result<Vec<_>, _>>()?;

        append(container, &root)?;
        Ok(Self {
            directories,
            files,
        })
    }

    pub fn directory(&self, id: DirId) -> Option<&DirElements> {
        self.directories.get(id.0)
    }

    pub fn file(&self, id: FileId) -> Option<&HtmlElement> {
        self.files.get(id.0)
    }

    pub fn directories(&self) -> impl Iterator<Item = (DirId, &DirElements)> {
        self.directories
            .iter()
            .enumerate()
            .map(|(i, dir)| (DirId(i), dir))
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &HtmlElement)> {
        self.files.iter().enumerate().map(|(i, file)| (FileId(i), file))
    }

    /// Reflect a directory's expansion on its nested list and its caret
    pub fn set_expanded(&self, id: DirId, expanded: bool) -> Result<(), Error> {
        let dir = self
            .directory(id)
            .ok_or(Error::Tree(TreeError::UnknownDirectory(id.0)))?;
        set_class(&dir.nested, EXPANDED_CLASS, expanded)?;
        set_class(&dir.caret, CARET_DOWN_CLASS, expanded)
    }

    /// Mark one file row as selected and clear the previous one
    pub fn set_selected(&self, previous: Option<FileId>, current: FileId) -> Result<(), Error> {
        if let Some(previous) = previous.and_then(|id| self.file(id)) {
            set_class(previous, SELECTED_CLASS, false)?;
        }
        let current = self
            .file(current)
            .ok_or(Error::Tree(TreeError::UnknownFile(current.0)))?;
        set_class(current, SELECTED_CLASS, true)
    }
}

/// Append the message shown in place of the tree when none is available
pub fn render_empty_state(
    document: &Document,
    container: &HtmlElement,
    message: &str,
) -> Result<HtmlElement, Error> {
    let empty = create_element(document, "p", &[EMPTY_CLASS])?;
    empty.set_text_content(Some(message));
    append(container, &empty)?;
    Ok(empty)
}

fn build_directory(
    document: &Document,
    parent: &HtmlElement,
    layout: &TreeLayout,
    id: DirId,
    directories: &mut [Option<DirElements>],
    files: &mut [Option<HtmlElement>],
) -> Result<(), Error> {
    let dir = layout.directory(id)?;

    let item = create_element(document, "li", &[])?;
    let row = create_element(document, "div", &[DIR_ROW_CLASS])?;
    set_attribute(&row, "data-path", &dir.path)?;
    set_attribute(&row, "data-depth", &dir.depth.to_string())?;
    append(&row, &create_indent(document, dir.depth + 1)?)?;

    let caret = create_element(document, "span", &[CARET_CLASS, "content"])?;
    caret.set_text_content(Some(&dir.name));
    append(&row, &caret)?;

    let nested = create_element(document, "ul", &[NESTED_CLASS])?;
    set_attribute(&nested, "style", &format!("--level: {}", dir.depth + 1))?;

    append(&item, &row)?;
    append(&item, &nested)?;

    for entry in &dir.entries {
        match *entry {
            Row::File(file_id) => {
                let file = layout.file(file_id)?;
                let file_item = create_element(document, "li", &[])?;
                let file_row = create_element(document, "div", &[FILE_ROW_CLASS])?;
                set_attribute(&file_row, "data-parent-path", &file.parent_path)?;
                set_attribute(&file_row, "data-depth", &file.depth.to_string())?;
                // A note sits at the same level as the row of its directory
                append(&file_row, &create_indent(document, file.depth)?)?;

                let content = create_element(document, "span", &["content"])?;
                content.set_text_content(Some(&file.name));
                set_attribute(&content, "data-name", &file.name)?;
                set_attribute(&content, "data-type", &file.kind)?;
                append(&file_row, &content)?;

                append(&file_item, &file_row)?;
                append(&nested, &file_item)?;
                if let Some(slot) = files.get_mut(file_id.0) {
                    *slot = Some(file_row);
                }
            }
            Row::Directory(child) => {
                build_directory(document, &nested, layout, child, directories, files)?
            }
        }
    }

    append(parent, &item)?;
    if let Some(slot) = directories.get_mut(id.0) {
        *slot = Some(DirElements { row, caret, nested });
    }
    Ok(())
}

fn create_indent(document: &Document, level: usize) -> Result<HtmlElement, Error> {
    let indent = create_element(document, "span", &["indent"])?;
    set_attribute(&indent, "style", &format!("--level: {}", level))?;
    Ok(indent)
}

fn create_element(document: &Document, tag: &str, classes: &[&str]) -> Result<HtmlElement, Error> {
    let element: HtmlElement = document
        .create_element(tag)
        .map_err(|e| Error::Dom(format!("Failed to create <{}>: {:?}", tag, e)))?
        .dyn_into()
        .map_err(|_| Error::Dom(format!("<{}> is not an html element", tag)))?;
    for class in classes {
        element
            .class_list()
            .add_1(class)
            .map_err(|e| Error::Dom(format!("{:?}", e)))?;
    }
    Ok(element)
}

fn set_attribute(element: &HtmlElement, name: &str, value: &str) -> Result<(), Error> {
    element
        .set_attribute(name, value)
        .map_err(|e| Error::Dom(format!("Failed to set {}: {:?}", name, e)))
}

fn set_class(element: &HtmlElement, class: &str, on: bool) -> Result<(), Error> {
    element
        .class_list()
        .toggle_with_force(class, on)
        .map(|_| ())
        .map_err(|e| Error::Dom(format!("Failed to toggle {}: {:?}", class, e)))
}

fn append(parent: &HtmlElement, child: &HtmlElement) -> Result<(), Error> {
    parent
        .append_child(child)
        .map(|_| ())
        .map_err(|e| Error::Dom(format!("{:?}", e)))
}
