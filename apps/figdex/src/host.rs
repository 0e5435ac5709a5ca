//! Minimal rendering host for the collector.
//!
//! Mirrors what a browser page does with the component: mount, render a first
//! frame, run the deferred pass at the end of that frame, render again.

use figdex_collector::CaptionItem;
use figdex_collector::CollectorConfig;
use figdex_collector::DeferredPass;
use figdex_collector::IdGenerator;
use figdex_collector::ItemCollector;
use figdex_collector::anchor_list;
use figdex_core::FigdexError;
use figdex_core::FigdexResult;
use figdex_dom::DOCUMENT_NODE;
use figdex_dom::Document;
use figdex_dom::NodeId;
use figdex_html::HtmlParser;

/// Upper bound on frames spent waiting for the collector to become ready.
const MAX_SETTLE_FRAMES: u32 = 4;

#[derive(Debug)]
pub(crate) struct Page<G: IdGenerator> {
    doc: Document,
    collector: ItemCollector<G>,
    pending: Vec<DeferredPass>,
    frames: u32,
}

/// Output of one frame: the list markup lives in its own document.
#[derive(Debug)]
pub(crate) struct Frame {
    pub output: Document,
    pub list: Option<NodeId>,
}

impl<G: IdGenerator> Page<G> {
    pub(crate) fn load(source: &str, config: CollectorConfig, ids: G) -> Self {
        let doc = HtmlParser.parse(source);
        let mut collector = ItemCollector::with_id_generator(config, ids);
        let pending = collector.mount().into_iter().collect();
        Self {
            doc,
            collector,
            pending,
            frames: 0,
        }
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn items(&self) -> &[CaptionItem] {
        self.collector.items()
    }

    /// Renders the collector, then runs work deferred to the end of the frame.
    pub(crate) fn render_frame(&mut self) -> Frame {
        self.frames = self.frames.saturating_add(1);

        let mut output = Document::empty();
        let list = self
            .collector
            .render(|items| anchor_list(&mut output, items))
            .map(|rendered| rendered.attach(&mut output, DOCUMENT_NODE));

        for pass in self.pending.drain(..) {
            pass.run(&mut self.collector, &mut self.doc);
        }

        tracing::debug!(frame = self.frames, rendered = list.is_some(), "frame complete");
        Frame { output, list }
    }

    /// Renders frames until the collector produced its list.
    pub(crate) fn settle(&mut self) -> FigdexResult<Frame> {
        for _ in 0..MAX_SETTLE_FRAMES {
            let frame = self.render_frame();
            if frame.list.is_some() {
                return Ok(frame);
            }
        }

        Err(FigdexError::new(
            "host.not_ready",
            format!("collector not ready after {MAX_SETTLE_FRAMES} frames"),
        ))
    }

    /// Renders the list into the element with `target_id` inside the page itself.
    pub(crate) fn inject(&mut self, target_id: &str) -> FigdexResult<NodeId> {
        let Some(target) = self.doc.element_by_id(target_id) else {
            return Err(FigdexError::new(
                "host.inject_target_missing",
                format!("no element with id `{target_id}` to inject the list into"),
            ));
        };

        let doc = &mut self.doc;
        let rendered = self
            .collector
            .render(|items| anchor_list(doc, items))
            .ok_or_else(|| {
                FigdexError::new("host.not_ready", "list injected before the collection pass")
            })?;
        Ok(rendered.attach(&mut self.doc, target))
    }
}
