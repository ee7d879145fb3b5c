use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use noteviewer_networking::Fetcher;
use noteviewer_tree::{
    address::PreviewRequest,
    expand::{Expansion, ExpansionState},
    layout::{DirId, FileId, TreeLayout},
};
use web_sys::{
    wasm_bindgen::{closure::Closure, JsCast},
    Event, HtmlElement,
};

use crate::{
    dom::TreeView,
    error::Error,
    preview::{PreviewRenderer, PreviewSink},
};

/// Reacts to clicks on a mounted tree.
/// Directory rows toggle their own nested list. File rows are previewed.
pub struct InteractionController<F, S> {
    layout: Rc<TreeLayout>,
    view: TreeView,
    expansion: RefCell<ExpansionState>,
    selected: Cell<Option<FileId>>,
    preview: Rc<PreviewRenderer<F, S>>,
}

impl<F, S> InteractionController<F, S>
where
    F: Fetcher + 'static,
    S: PreviewSink + 'static,
{
    /// Attach the click listeners to every row of the view.
    /// The listeners live as long as the page.
    pub fn bind(
        layout: Rc<TreeLayout>,
        view: TreeView,
        preview: Rc<PreviewRenderer<F, S>>,
    ) -> Result<Rc<Self>, Error> {
        let controller = Rc::new(Self {
            expansion: RefCell::new(ExpansionState::new(&layout)),
            selected: Cell::new(None),
            layout,
            view,
            preview,
        });

        for (id, dir) in controller.view.directories() {
            let controller_f = controller.clone();
            listen(&dir.row, move |event| {
                event.stop_propagation();
                if let Err(e) = controller_f.toggle_directory(id) {
                    log::error!("Failed to toggle directory: {}", e);
                }
            })?;
        }

        for (id, file) in controller.view.files() {
            let controller_f = controller.clone();
            listen(file, move |event| {
                event.stop_propagation();
                let request = match controller_f.select_file(id) {
                    Ok(request) => request,
                    Err(e) => {
                        log::error!("Failed to select file: {}", e);
                        return;
                    }
                };
                let preview = controller_f.preview.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    preview.show(&request).await;
                });
            })?;
        }

        Ok(controller)
    }

    /// Toggle one directory row. Nothing else changes state.
    pub fn toggle_directory(&self, id: DirId) -> Result<Expansion, Error> {
        let state = self.expansion.borrow_mut().toggle(id)?;
        self.view.set_expanded(id, state.is_expanded())?;
        Ok(state)
    }

    /// Mark a file row as selected and resolve its render address
    pub fn select_file(&self, id: FileId) -> Result<PreviewRequest, Error> {
        let request = self.layout.address(id)?;
        self.view.set_selected(self.selected.get(), id)?;
        self.selected.set(Some(id));
        log::debug!("Selected {}/{}", request.parent_path, request.name);
        Ok(request)
    }

    #[cfg(test)]
    fn expansion(&self, id: DirId) -> Result<Expansion, Error> {
        Ok(self.expansion.borrow().get(id)?)
    }

    #[cfg(test)]
    fn selected(&self) -> Option<FileId> {
        self.selected.get()
    }

    #[cfg(test)]
    fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    #[cfg(test)]
    fn view(&self) -> &TreeView {
        &self.view
    }

    #[cfg(test)]
    fn preview(&self) -> &PreviewRenderer<F, S> {
        &self.preview
    }
}

fn listen(element: &HtmlElement, handler: impl Fn(Event) + 'static) -> Result<(), Error> {
    element
        .add_event_listener_with_callback(
            "click",
            Closure::<dyn Fn(Event)>::new(handler)
                .into_js_value()
                .unchecked_ref(),
        )
        .map_err(|e| Error::Dom(format!("Failed to add click listener: {:?}", e)))
}
