use std::rc::Rc;

use noteviewer_networking::{query::with_query, sequence::RequestSequencer, Fetcher};
use noteviewer_tree::address::PreviewRequest;
use web_sys::HtmlElement;

pub const LOADING_CLASS: &str = "loading";

/// The region that shows rendered notes
pub trait PreviewSink {
    /// Replace the whole content with the markup as given
    fn replace(&self, markup: &str);
    /// Mark the pane as waiting for a render
    fn set_loading(&self, loading: bool);
}

impl PreviewSink for HtmlElement {
    fn replace(&self, markup: &str) {
        // Markup comes from the same-origin render endpoint and is trusted as is
        self.set_inner_html(markup);
    }

    fn set_loading(&self, loading: bool) {
        if let Err(e) = self.class_list().toggle_with_force(LOADING_CLASS, loading) {
            log::warn!("Failed to toggle preview loading marker: {:?}", e);
        }
    }
}

impl<T: PreviewSink + ?Sized> PreviewSink for Rc<T> {
    fn replace(&self, markup: &str) {
        (**self).replace(markup)
    }

    fn set_loading(&self, loading: bool) {
        (**self).set_loading(loading)
    }
}

/// What happened to one preview request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Rendered,
    Failed,
    /// A later request was issued before this one resolved, so its result was dropped
    Superseded,
}

/// Fetches rendered notes and writes them into the preview pane
pub struct PreviewRenderer<F, S> {
    fetcher: F,
    sink: S,
    endpoint: String,
    sequencer: RequestSequencer,
}

impl<F: Fetcher, S: PreviewSink> PreviewRenderer<F, S> {
    pub fn new(fetcher: F, sink: S, endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            sink,
            endpoint: endpoint.into(),
            sequencer: RequestSequencer::new(),
        }
    }

    /// The render url for a note
    pub fn url_for(&self, request: &PreviewRequest) -> String {
        with_query(&self.endpoint, request.query_pairs())
    }

    /// Fetch the note and show it.
    /// The pane is only written if no other request was issued while this one was in flight.
    /// On failure the pane keeps its previous content. Failures are logged even when superseded.
    pub async fn show(&self, request: &PreviewRequest) -> PreviewOutcome {
        let ticket = self.sequencer.issue();
        let url = self.url_for(request);
        self.sink.set_loading(true);

        let result = self.fetcher.get_text(&url).await;
        if let Err(e) = &result {
            log::error!("Failed to render {}/{}: {}", request.parent_path, request.name, e);
        }

        if !self.sequencer.is_current(ticket) {
            log::debug!(
                "Dropping preview of {} (request {} of {})",
                request.name,
                ticket.value(),
                self.sequencer.issued()
            );
            return PreviewOutcome::Superseded;
        }
        self.sink.set_loading(false);

        match result {
            Ok(markup) => {
                self.sink.replace(&markup);
                PreviewOutcome::Rendered
            }
            Err(_) => PreviewOutcome::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
        rc::Rc,
    };

    use futures::{
        channel::oneshot,
        executor::{block_on, LocalPool},
        task::LocalSpawnExt,
    };
    use noteviewer_networking::{error::Error, request::FetchResponse, Fetcher};
    use noteviewer_tree::address::PreviewRequest;

    use super::{PreviewOutcome, PreviewRenderer, PreviewSink};

    thread_local! {
        static RECORDS: RefCell<Vec<(log::Level, String)>> = RefCell::new(Vec::new());
    }

    /// Keeps the records of the current test thread
    struct Capture;

    impl log::Log for Capture {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            RECORDS.with(|records| {
                records
                    .borrow_mut()
                    .push((record.level(), record.args().to_string()))
            });
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture;

    fn capture_logs() {
        // Another test may already have installed it
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);
        RECORDS.with(|records| records.borrow_mut().clear());
    }

    fn logged_errors() -> Vec<String> {
        RECORDS.with(|records| {
            records
                .borrow()
                .iter()
                .filter(|(level, _)| *level == log::Level::Error)
                .map(|(_, message)| message.clone())
                .collect()
        })
    }

    #[derive(Default)]
    struct Pane {
        content: RefCell<String>,
        loading: Cell<bool>,
    }

    impl PreviewSink for Pane {
        fn replace(&self, markup: &str) {
            *self.content.borrow_mut() = markup.to_string();
        }

        fn set_loading(&self, loading: bool) {
            self.loading.set(loading);
        }
    }

    /// Answers every url with the same response and records what was asked for
    struct Fixed {
        response: FetchResponse,
        urls: RefCell<Vec<String>>,
    }

    impl Fetcher for Fixed {
        async fn get(&self, url: &str) -> Result<FetchResponse, Error> {
            self.urls.borrow_mut().push(url.to_string());
            Ok(self.response.clone())
        }
    }

    /// Answers each url when the test sends its response
    #[derive(Default)]
    struct Deferred {
        pending: RefCell<HashMap<String, oneshot::Receiver<FetchResponse>>>,
    }

    impl Deferred {
        fn expect(&self, url: &str) -> oneshot::Sender<FetchResponse> {
            let (sender, receiver) = oneshot::channel();
            self.pending.borrow_mut().insert(url.to_string(), receiver);
            sender
        }
    }

    impl Fetcher for Deferred {
        async fn get(&self, url: &str) -> Result<FetchResponse, Error> {
            let receiver = self
                .pending
                .borrow_mut()
                .remove(url)
                .ok_or(Error::Transport(format!("unexpected request {}", url)))?;
            receiver
                .await
                .map_err(|_| Error::Transport("cancelled".to_string()))
        }
    }

    fn fixed(status: u16, body: &str) -> Fixed {
        Fixed {
            response: FetchResponse::new(status, body),
            urls: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn requests_encoded_address() {
        let pane = Rc::new(Pane::default());
        let renderer = PreviewRenderer::new(fixed(200, "<svg/>"), pane.clone(), "/render");

        let outcome = block_on(renderer.show(&PreviewRequest::new("/", "a.md", "note")));

        assert_eq!(outcome, PreviewOutcome::Rendered);
        assert_eq!(
            renderer.fetcher.urls.borrow().as_slice(),
            ["/render?parentPath=%2F&name=a.md&type=note"]
        );
        assert_eq!(*pane.content.borrow(), "<svg/>");
        assert!(!pane.loading.get());
    }

    #[test]
    fn error_status_keeps_content() {
        let pane = Rc::new(Pane::default());
        pane.replace("<p>before</p>");
        let renderer = PreviewRenderer::new(fixed(500, "boom"), pane.clone(), "/render");

        let outcome = block_on(renderer.show(&PreviewRequest::new("Notes", "x", "Typst")));

        assert_eq!(outcome, PreviewOutcome::Failed);
        assert_eq!(*pane.content.borrow(), "<p>before</p>");
        assert!(!pane.loading.get());
    }

    #[test]
    fn late_response_of_earlier_click_is_dropped() {
        let pane = Rc::new(Pane::default());
        let fetcher = Deferred::default();
        let first = PreviewRequest::new("Notes", "first", "Typst");
        let second = PreviewRequest::new("Notes", "second", "Typst");
        let first_url = "/render?parentPath=Notes&name=first&type=Typst";
        let second_url = "/render?parentPath=Notes&name=second&type=Typst";
        let answer_first = fetcher.expect(first_url);
        let answer_second = fetcher.expect(second_url);

        let renderer = Rc::new(PreviewRenderer::new(fetcher, pane.clone(), "/render"));
        let outcomes = Rc::new(RefCell::new(Vec::new()));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for request in [first, second] {
            let renderer = renderer.clone();
            let outcomes = outcomes.clone();
            spawner
                .spawn_local(async move {
                    let outcome = renderer.show(&request).await;
                    outcomes.borrow_mut().push((request.name, outcome));
                })
                .unwrap();
        }
        pool.run_until_stalled();
        assert!(pane.loading.get());

        answer_second.send(FetchResponse::new(200, "second")).unwrap();
        pool.run_until_stalled();
        assert_eq!(*pane.content.borrow(), "second");
        assert!(!pane.loading.get());

        answer_first.send(FetchResponse::new(200, "first")).unwrap();
        pool.run_until_stalled();
        assert_eq!(*pane.content.borrow(), "second");

        assert_eq!(
            *outcomes.borrow(),
            vec![
                ("second".to_string(), PreviewOutcome::Rendered),
                ("first".to_string(), PreviewOutcome::Superseded),
            ]
        );
    }

    #[test]
    fn superseded_failure_is_still_logged() {
        capture_logs();
        let pane = Rc::new(Pane::default());
        let fetcher = Deferred::default();
        let older = PreviewRequest::new("Notes", "older", "Typst");
        let newer = PreviewRequest::new("Notes", "newer", "Typst");
        let answer_older = fetcher.expect("/render?parentPath=Notes&name=older&type=Typst");
        let answer_newer = fetcher.expect("/render?parentPath=Notes&name=newer&type=Typst");

        let renderer = Rc::new(PreviewRenderer::new(fetcher, pane.clone(), "/render"));
        let outcomes = Rc::new(RefCell::new(Vec::new()));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for request in [older, newer] {
            let renderer = renderer.clone();
            let outcomes = outcomes.clone();
            spawner
                .spawn_local(async move {
                    let outcome = renderer.show(&request).await;
                    outcomes.borrow_mut().push((request.name, outcome));
                })
                .unwrap();
        }
        pool.run_until_stalled();

        answer_newer.send(FetchResponse::new(200, "newer")).unwrap();
        pool.run_until_stalled();
        answer_older
            .send(FetchResponse::new(500, "server exploded"))
            .unwrap();
        pool.run_until_stalled();

        assert_eq!(*pane.content.borrow(), "newer");
        assert_eq!(
            outcomes.borrow()[1],
            ("older".to_string(), PreviewOutcome::Superseded)
        );
        let errors = logged_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("older"));
        assert!(errors[0].contains("server exploded"));
    }

    #[test]
    fn failure_is_logged_at_error() {
        capture_logs();
        let pane = Rc::new(Pane::default());
        let renderer = PreviewRenderer::new(fixed(404, "missing"), pane, "/render");

        block_on(renderer.show(&PreviewRequest::new("Notes", "gone", "LaTeX")));

        let errors = logged_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Notes/gone"));
    }
}
