//! Content pipeline: turns a page transition into "show this front matter"
//! or "hide the panel".
//!
//! View-mode transitions fetch the page body asynchronously, so results can
//! complete out of order. Every apply goes through [`ApplyGate`], which only
//! lets a transition through when it is newer than the last one applied.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Context;

use crate::front_matter::{extract_front_matter, FrontMatter};
use crate::growi_api::ContentSource;
use crate::mount::{HostDocument, MountManager};
use crate::navigation::{HandlerOutcome, Transition};
use crate::page_context::PageMode;

// ---------------------------------------------------------------------------
// Stale-result guard
// ---------------------------------------------------------------------------

/// Remembers the newest transition sequence that reached the panel.
#[derive(Debug, Default)]
pub struct ApplyGate {
    last_applied: Cell<u64>,
}

impl ApplyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to apply `sequence`. Fails for anything not newer
    /// than the last claimed or retired sequence.
    pub fn try_claim(&self, sequence: u64) -> bool {
        if sequence <= self.last_applied.get() {
            return false;
        }
        self.last_applied.set(sequence);
        true
    }

    /// Invalidate every sequence up to and including `sequence`.
    pub fn retire_through(&self, sequence: u64) {
        if sequence > self.last_applied.get() {
            self.last_applied.set(sequence);
        }
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied.get()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

enum PanelUpdate {
    Show(FrontMatter),
    Hide,
}

/// Fetch → extract → show/hide, for one mount manager.
pub struct ContentPipeline<S, D: HostDocument> {
    source: Rc<S>,
    mount: Rc<RefCell<MountManager<D>>>,
    gate: Rc<ApplyGate>,
}

impl<S, D: HostDocument> Clone for ContentPipeline<S, D> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            mount: Rc::clone(&self.mount),
            gate: Rc::clone(&self.gate),
        }
    }
}

impl<S, D> ContentPipeline<S, D>
where
    S: ContentSource + 'static,
    D: HostDocument + 'static,
{
    pub fn new(source: Rc<S>, mount: Rc<RefCell<MountManager<D>>>) -> Self {
        Self {
            source,
            mount,
            gate: Rc::new(ApplyGate::new()),
        }
    }

    pub fn gate(&self) -> &ApplyGate {
        &self.gate
    }

    /// Handle one deduplicated transition.
    ///
    /// Edit mode hides synchronously without touching the network; view mode
    /// returns the fetch as pending work for the caller to spawn.
    pub fn on_transition(&self, transition: Transition) -> HandlerOutcome {
        let Transition { context, sequence } = transition;

        if context.mode == PageMode::Edit {
            return HandlerOutcome::Ready(self.apply(sequence, PanelUpdate::Hide));
        }

        let pipeline = self.clone();
        HandlerOutcome::Pending(Box::pin(async move {
            let body = pipeline
                .source
                .fetch_page_body(&context.page_id, context.revision_id.as_deref())
                .await;

            let update = match body.as_deref().and_then(extract_front_matter) {
                Some(front_matter) => PanelUpdate::Show(front_matter),
                None => PanelUpdate::Hide,
            };
            pipeline
                .apply(sequence, update)
                .with_context(|| format!("page {} (sequence {sequence})", context.page_id))
        }))
    }

    /// Hide the panel and discard every result still in flight up to `sequence`.
    pub fn retire(&self, sequence: u64) {
        self.gate.retire_through(sequence);
        self.mount.borrow_mut().hide();
    }

    fn apply(&self, sequence: u64, update: PanelUpdate) -> anyhow::Result<()> {
        if !self.gate.try_claim(sequence) {
            tracing::debug!(
                sequence,
                last_applied = self.gate.last_applied(),
                "stale transition result discarded"
            );
            return Ok(());
        }

        let mut mount = self.mount.borrow_mut();
        match update {
            PanelUpdate::Show(front_matter) => {
                tracing::debug!(
                    sequence,
                    parsed = front_matter.parsed.is_some(),
                    "showing front matter"
                );
                mount.show(&front_matter).context("failed to show front matter panel")
            }
            PanelUpdate::Hide => {
                mount.hide();
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnchorLocator;
    use crate::mount::MountOptions;
    use crate::page_context::PageContext;
    use crate::testing::{FakeDocument, StubContent};

    const ID: &str = "fmv";
    const A: &str = "6995d3fcf17c96c558f6b0ab";
    const B: &str = "6995d3fcf17c96c558f6b0ac";

    fn transition(page_id: &str, mode: PageMode, revision_id: Option<&str>, sequence: u64) -> Transition {
        Transition {
            context: PageContext {
                page_id: page_id.to_string(),
                mode,
                revision_id: revision_id.map(str::to_string),
            },
            sequence,
        }
    }

    fn view(page_id: &str, sequence: u64) -> Transition {
        transition(page_id, PageMode::View, None, sequence)
    }

    fn setup(content: StubContent) -> (ContentPipeline<StubContent, FakeDocument>, Rc<StubContent>, FakeDocument) {
        let doc = FakeDocument::new();
        doc.add_anchor(".sidebar");
        let mount = MountManager::new(
            doc.clone(),
            MountOptions {
                container_id: ID.to_string(),
                anchors: vec![AnchorLocator::append_to(".sidebar")],
                fallback_style: String::new(),
            },
        );
        let content = Rc::new(content);
        let pipeline = ContentPipeline::new(Rc::clone(&content), Rc::new(RefCell::new(mount)));
        (pipeline, content, doc)
    }

    async fn run(outcome: HandlerOutcome) -> anyhow::Result<()> {
        match outcome {
            HandlerOutcome::Ready(result) => result,
            HandlerOutcome::Pending(work) => work.await,
        }
    }

    #[test]
    fn gate_claims_only_newer_sequences() {
        let gate = ApplyGate::new();
        assert!(gate.try_claim(2));
        assert!(!gate.try_claim(1));
        assert!(!gate.try_claim(2));
        assert!(gate.try_claim(5));
        assert_eq!(gate.last_applied(), 5);
    }

    #[test]
    fn gate_retire_never_lowers() {
        let gate = ApplyGate::new();
        gate.retire_through(4);
        assert!(!gate.try_claim(4));
        gate.retire_through(2);
        assert_eq!(gate.last_applied(), 4);
        assert!(gate.try_claim(5));
    }

    #[tokio::test]
    async fn view_with_front_matter_shows_panel() {
        let (pipeline, _, doc) =
            setup(StubContent::default().with_page(A, "---\ntitle: Hello\ntags: [a, b]\n---\n# Body"));

        run(pipeline.on_transition(view(A, 1))).await.unwrap();

        let shown = doc.displayed(ID).unwrap();
        assert_eq!(shown.raw, "title: Hello\ntags: [a, b]");
        let parsed = shown.parsed.unwrap();
        assert_eq!(parsed["title"], "Hello");
    }

    #[tokio::test]
    async fn revision_is_fetched_when_present() {
        let (pipeline, content, doc) =
            setup(StubContent::default().with_revision(A, "r1", "---\nv: 1\n---\n"));

        run(pipeline.on_transition(transition(A, PageMode::View, Some("r1"), 1)))
            .await
            .unwrap();

        assert_eq!(content.requests(), vec![(A.to_string(), Some("r1".to_string()))]);
        assert_eq!(doc.displayed(ID).unwrap().raw, "v: 1");
    }

    #[tokio::test]
    async fn edit_mode_hides_without_fetching() {
        let (pipeline, content, doc) = setup(StubContent::default().with_page(A, "---\na: 1\n---\n"));
        run(pipeline.on_transition(view(A, 1))).await.unwrap();
        assert_eq!(doc.count_by_id(ID), 1);

        let outcome = pipeline.on_transition(transition(A, PageMode::Edit, None, 2));

        assert!(matches!(outcome, HandlerOutcome::Ready(Ok(()))));
        assert_eq!(doc.count_by_id(ID), 0);
        assert_eq!(content.requests().len(), 1);
    }

    #[tokio::test]
    async fn page_without_front_matter_hides() {
        let (pipeline, content, doc) = setup(
            StubContent::default()
                .with_page(A, "---\na: 1\n---\n")
                .with_page(B, "# Just a heading\n---\nnot: front matter\n---\n"),
        );
        run(pipeline.on_transition(view(A, 1))).await.unwrap();

        run(pipeline.on_transition(view(B, 2))).await.unwrap();

        assert_eq!(doc.count_by_id(ID), 0);
        assert_eq!(content.requests().len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_hides() {
        let (pipeline, content, doc) = setup(StubContent::default().with_page(A, "---\na: 1\n---\n"));
        run(pipeline.on_transition(view(A, 1))).await.unwrap();

        // B is unknown to the stub, like a 404 from the API
        run(pipeline.on_transition(view(B, 2))).await.unwrap();

        assert_eq!(doc.count_by_id(ID), 0);
        content.set_page(B, "---\nb: 2\n---\n");
        run(pipeline.on_transition(view(B, 3))).await.unwrap();
        assert_eq!(doc.displayed(ID).unwrap().raw, "b: 2");
    }

    #[tokio::test]
    async fn scalar_front_matter_hides() {
        let (pipeline, _, doc) = setup(StubContent::default().with_page(A, "---\njust a string\n---\n"));

        run(pipeline.on_transition(view(A, 1))).await.unwrap();

        assert_eq!(doc.count_by_id(ID), 0);
    }

    #[tokio::test]
    async fn parse_failure_shows_raw_only() {
        let (pipeline, _, doc) =
            setup(StubContent::default().with_page(A, "---\ntitle: [unclosed\n---\nbody"));

        run(pipeline.on_transition(view(A, 1))).await.unwrap();

        let shown = doc.displayed(ID).unwrap();
        assert_eq!(shown.raw, "title: [unclosed");
        assert!(shown.parsed.is_none());
    }

    #[tokio::test]
    async fn repeated_shows_keep_one_container() {
        let (pipeline, content, doc) = setup(StubContent::default().with_page(A, "---\nn: 1\n---\n"));

        run(pipeline.on_transition(view(A, 1))).await.unwrap();
        content.set_page(A, "---\nn: 2\n---\n");
        run(pipeline.on_transition(view(A, 2))).await.unwrap();

        assert_eq!(doc.count_by_id(ID), 1);
        assert_eq!(doc.live_roots(), 1);
        assert_eq!(doc.displayed(ID).unwrap().raw, "n: 2");
    }

    #[tokio::test]
    async fn slow_earlier_result_is_discarded() {
        let (pipeline, _, doc) = setup(
            StubContent::default()
                .with_page(A, "---\npage: a\n---\n")
                .with_page(B, "---\npage: b\n---\n"),
        );

        let first = pipeline.on_transition(view(A, 1));
        let second = pipeline.on_transition(view(B, 2));

        // The later transition completes first
        run(second).await.unwrap();
        run(first).await.unwrap();

        assert_eq!(doc.displayed(ID).unwrap().raw, "page: b");
    }

    #[tokio::test]
    async fn slow_show_cannot_undo_later_edit_hide() {
        let (pipeline, _, doc) = setup(StubContent::default().with_page(A, "---\na: 1\n---\n"));

        let fetch = pipeline.on_transition(view(A, 1));
        run(pipeline.on_transition(transition(A, PageMode::Edit, None, 2)))
            .await
            .unwrap();
        run(fetch).await.unwrap();

        assert_eq!(doc.count_by_id(ID), 0);
    }

    #[tokio::test]
    async fn retire_hides_and_drops_in_flight_results() {
        let (pipeline, _, doc) = setup(StubContent::default().with_page(A, "---\na: 1\n---\n"));
        run(pipeline.on_transition(view(A, 1))).await.unwrap();

        let in_flight = pipeline.on_transition(view(A, 2));
        pipeline.retire(2);
        run(in_flight).await.unwrap();

        assert_eq!(doc.count_by_id(ID), 0);
        assert_eq!(pipeline.gate().last_applied(), 2);
    }

    #[tokio::test]
    async fn mount_failure_is_reported_with_context() {
        let (pipeline, _, doc) = setup(StubContent::default().with_page(A, "---\na: 1\n---\n"));
        doc.fail_create_root(true);

        let err = run(pipeline.on_transition(view(A, 1))).await.unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains(A), "{message}");
        assert!(message.contains("failed to show front matter panel"), "{message}");
        assert_eq!(doc.count_by_id(ID), 0);
    }
}
