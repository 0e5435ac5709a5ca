use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::CaptionItem;
use crate::CaptionTree;
use crate::CollectorConfig;
use crate::IdGenerator;
use crate::Readiness;
use crate::Rendered;
use crate::UuidV4Ids;

/// Attempts at drawing an id that is not already used in the document.
const MAX_ID_ATTEMPTS: usize = 16;

/// Source of per-collector tickets that bind a [`DeferredPass`] to its issuer.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Builds and holds the list of figures for one document.
#[derive(Debug)]
pub struct ItemCollector<G = UuidV4Ids> {
    config: CollectorConfig,
    ids: G,
    ticket: u64,
    readiness: Readiness,
    mounted: bool,
    items: Vec<CaptionItem>,
}

/// The collection pass scheduled by [`ItemCollector::mount`].
///
/// The host runs it once its current rendering cycle has finished, so the scan
/// sees fully materialized content. Running consumes the token.
#[derive(Debug)]
#[must_use = "the collection pass only happens when the token is run"]
pub struct DeferredPass {
    ticket: u64,
}

impl DeferredPass {
    /// Runs the pass on the collector that issued this token.
    ///
    /// A token handed to any other collector does nothing and returns `false`.
    pub fn run<G, T>(self, collector: &mut ItemCollector<G>, tree: &mut T) -> bool
    where
        G: IdGenerator,
        T: CaptionTree,
    {
        if self.ticket != collector.ticket {
            tracing::warn!(
                ticket = self.ticket,
                collector = collector.ticket,
                "ignoring collection pass issued by another collector"
            );
            return false;
        }
        collector.collect(tree);
        true
    }
}

impl ItemCollector<UuidV4Ids> {
    pub fn new(config: CollectorConfig) -> Self {
        Self::with_id_generator(config, UuidV4Ids)
    }
}

impl Default for ItemCollector<UuidV4Ids> {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

impl<G: IdGenerator> ItemCollector<G> {
    pub fn with_id_generator(config: CollectorConfig, ids: G) -> Self {
        Self {
            config,
            ids,
            ticket: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
            readiness: Readiness::Unready,
            mounted: false,
            items: Vec::new(),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn items(&self) -> &[CaptionItem] {
        &self.items
    }

    /// Schedules the first collection pass. Only the first call yields a token.
    pub fn mount(&mut self) -> Option<DeferredPass> {
        if self.mounted {
            return None;
        }
        self.mounted = true;
        Some(DeferredPass {
            ticket: self.ticket,
        })
    }

    /// Rebuilds the item list from `tree` and marks the collector ready.
    ///
    /// Captions without an identifier get a freshly generated one written back
    /// onto the element, so later passes (and any other reader of the tree)
    /// see the same id. A missing scan root yields an empty list.
    pub fn collect<T: CaptionTree>(&mut self, tree: &mut T) -> &[CaptionItem] {
        self.items.clear();

        let markers = tree
            .scan_root(self.config.scope_id.as_deref())
            .map(|root| tree.find_markers(root, &self.config.marker_tag))
            .unwrap_or_default();

        let mut used_ids: Option<HashSet<String>> = None;
        let mut generated = 0_usize;

        for node in markers {
            let existing = tree
                .attribute(node, &self.config.id_attribute)
                .filter(|id| !id.is_empty())
                .map(str::to_owned);

            let id = match existing {
                Some(id) => id,
                None => {
                    let used = used_ids
                        .get_or_insert_with(|| tree.used_ids(&self.config.id_attribute));
                    let id = fresh_id(&mut self.ids, used);
                    tree.set_attribute(node, &self.config.id_attribute, &id);
                    used.insert(id.clone());
                    generated += 1;
                    tracing::trace!(id = %id, "assigned caption id");
                    id
                }
            };

            let attrs = tree
                .attribute_pairs(node)
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect::<BTreeMap<_, _>>();

            let title = match attrs.get(&self.config.title_attribute) {
                Some(title) if !title.is_empty() => title.clone(),
                _ => tree.text_content(node),
            };

            self.items.push(CaptionItem {
                href: format!("#{id}"),
                id,
                title,
                attrs,
            });
        }

        self.readiness = Readiness::Ready;
        tracing::debug!(
            items = self.items.len(),
            generated_ids = generated,
            marker = %self.config.marker_tag,
            "collected list of figures"
        );
        &self.items
    }

    /// Hands the items to `template` and wraps its output, once ready.
    pub fn render<N, F>(&self, template: F) -> Option<Rendered<N>>
    where
        F: FnOnce(&[CaptionItem]) -> Vec<N>,
    {
        if !self.is_ready() {
            return None;
        }

        Some(Rendered {
            tag: self.config.wrapper_tag.clone(),
            children: template(&self.items),
        })
    }
}

fn fresh_id<G: IdGenerator>(ids: &mut G, used: &HashSet<String>) -> String {
    let mut candidate = ids.next_id();
    for _ in 1..MAX_ID_ATTEMPTS {
        if !candidate.is_empty() && !used.contains(&candidate) {
            return candidate;
        }
        candidate = ids.next_id();
    }

    tracing::warn!(id = %candidate, "id generator kept producing taken ids");
    candidate
}

#[cfg(test)]
mod tests {
    use super::ItemCollector;
    use crate::CaptionItem;
    use crate::CollectorConfig;
    use crate::IdGenerator;
    use crate::Readiness;
    use crate::SequentialIds;
    use crate::anchor_list;
    use figdex_dom::DOCUMENT_NODE;
    use figdex_dom::Document;
    use figdex_html::HtmlParser;
    use figdex_html::serialize;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::collections::HashSet;

    fn parse(source: &str) -> Document {
        HtmlParser.parse(source)
    }

    fn uuid_collector() -> ItemCollector {
        ItemCollector::default()
    }

    fn sequential() -> ItemCollector<SequentialIds> {
        ItemCollector::with_id_generator(CollectorConfig::default(), SequentialIds::default())
    }

    #[test]
    fn starts_unready_and_renders_nothing() {
        let collector = uuid_collector();
        assert_eq!(collector.readiness(), Readiness::Unready);
        assert!(collector.items().is_empty());
        assert!(collector.render(|items| items.to_vec()).is_none());
    }

    #[test]
    fn assigns_distinct_ids_and_writes_them_back() {
        let mut doc = parse(
            "<body><figure><figcaption>A</figcaption></figure>\
             <figure><figcaption>B</figcaption></figure>\
             <figure><figcaption>C</figcaption></figure></body>",
        );
        let mut collector = uuid_collector();
        collector.collect(&mut doc);

        let items = collector.items();
        assert_eq!(items.len(), 3);
        let ids = items.iter().map(|item| item.id.clone()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 3);

        let captions = doc.elements_by_tag_name(DOCUMENT_NODE, "figcaption");
        for (item, caption) in items.iter().zip(captions) {
            assert!(!item.id.is_empty());
            assert_eq!(doc.attribute(caption, "id"), Some(item.id.as_str()));
            assert_eq!(item.href, format!("#{}", item.id));
            assert_eq!(item.attrs.get("id"), Some(&item.id));
        }
    }

    #[test]
    fn keeps_existing_ids_verbatim() {
        let mut doc = parse("<figcaption id=\"Fig 1\">Chart</figcaption>");
        let mut collector = sequential();
        collector.collect(&mut doc);

        assert_eq!(collector.items()[0].id, "Fig 1");
        assert_eq!(collector.items()[0].href, "#Fig 1");
    }

    #[test]
    fn whitespace_id_is_kept_verbatim() {
        let mut doc =
            parse("<figcaption id=\"  \">Chart</figcaption><figcaption id=\"\">Map</figcaption>");
        let mut collector = sequential();
        collector.collect(&mut doc);

        assert_eq!(collector.items()[0].id, "  ");
        assert_eq!(collector.items()[0].href, "#  ");
        assert_eq!(collector.items()[1].id, "figure-1");
        let captions = doc.elements_by_tag_name(DOCUMENT_NODE, "figcaption");
        assert_eq!(doc.attribute(captions[0], "id"), Some("  "));
        assert_eq!(doc.attribute(captions[1], "id"), Some("figure-1"));
    }

    #[test]
    fn title_override_wins_over_text() {
        let mut doc = parse(
            "<figcaption data-lof-title=\"Short\">A <em>much</em> longer caption</figcaption>\
             <figcaption data-lof-title=\"\">  Spaced\ntext </figcaption>",
        );
        let mut collector = sequential();
        collector.collect(&mut doc);

        let titles = collector
            .items()
            .iter()
            .map(|item| item.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Short", "  Spaced\ntext "]);
    }

    #[test]
    fn second_pass_reuses_generated_ids() {
        let mut doc = parse("<figcaption>A</figcaption><figcaption id=b>B</figcaption>");
        let mut collector = uuid_collector();

        let first = collector.collect(&mut doc).to_vec();
        let after_first = serialize(&doc);
        let second = collector.collect(&mut doc).to_vec();

        assert_eq!(first, second);
        assert_eq!(serialize(&doc), after_first);
    }

    #[test]
    fn items_follow_document_order() {
        let mut doc = parse(
            "<section><figcaption id=z>Z</figcaption></section>\
             <div><div><figcaption id=a>A</figcaption></div></div>\
             <figcaption id=m>M</figcaption>",
        );
        let mut collector = sequential();
        collector.collect(&mut doc);

        let ids = collector
            .items()
            .iter()
            .map(|item| item.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn no_captions_renders_empty_wrapper() {
        let mut doc = parse("<body><p>No figures here</p></body>");
        let mut collector = uuid_collector();
        let pass = collector.mount().expect("first mount yields a pass");
        assert!(pass.run(&mut collector, &mut doc));

        assert!(collector.is_ready());
        assert!(collector.items().is_empty());

        let mut out = Document::empty();
        let rendered = collector
            .render(|items| anchor_list(&mut out, items))
            .expect("ready collector renders");
        assert_eq!(rendered.tag, "div");
        assert!(rendered.children.is_empty());
    }

    #[test]
    fn single_override_caption_matches_expected_item() {
        let mut doc = parse("<figcaption data-lof-title=\"Figure A\">Ignored</figcaption>");
        let mut collector = uuid_collector();
        collector.collect(&mut doc);

        let items = collector.items();
        assert_eq!(items.len(), 1);
        let generated = items[0].id.clone();
        let expected = CaptionItem {
            id: generated.clone(),
            href: format!("#{generated}"),
            title: "Figure A".to_owned(),
            attrs: BTreeMap::from([
                ("data-lof-title".to_owned(), "Figure A".to_owned()),
                ("id".to_owned(), generated.clone()),
            ]),
        };
        assert_eq!(items[0], expected);
        assert_eq!(generated.len(), 36);
    }

    #[test]
    fn missing_scope_yields_empty_collection() {
        let mut doc = parse("<figcaption>A</figcaption>");
        let config = CollectorConfig {
            scope_id: Some("app".to_owned()),
            ..CollectorConfig::default()
        };
        let mut collector = ItemCollector::new(config);
        collector.collect(&mut doc);

        assert!(collector.is_ready());
        assert!(collector.items().is_empty());
        let caption = doc.elements_by_tag_name(DOCUMENT_NODE, "figcaption")[0];
        assert_eq!(doc.attribute(caption, "id"), None);
    }

    #[test]
    fn empty_document_yields_empty_collection() {
        let mut doc = Document::empty();
        let mut collector = uuid_collector();
        assert!(collector.collect(&mut doc).is_empty());
        assert!(collector.is_ready());
    }

    #[test]
    fn mount_schedules_only_once() {
        let mut collector = uuid_collector();
        assert!(collector.mount().is_some());
        assert!(collector.mount().is_none());
        assert_eq!(collector.readiness(), Readiness::Unready);
    }

    #[test]
    fn pass_from_another_collector_is_ignored() {
        let mut doc = parse("<figcaption>A</figcaption>");
        let mut issuer = sequential();
        let mut other = sequential();
        let pass = issuer.mount().expect("first mount yields a pass");

        assert!(!pass.run(&mut other, &mut doc));
        assert!(!other.is_ready());
        assert!(!issuer.is_ready());
        let caption = doc.elements_by_tag_name(DOCUMENT_NODE, "figcaption")[0];
        assert_eq!(doc.attribute(caption, "id"), None);
    }

    #[test]
    fn title_fallback_decodes_named_references() {
        let mut doc = parse(
            "<p>&copy; 2024 &mdash; ACME</p><figcaption>Figure 1 &ndash; Network</figcaption>\
             <figcaption data-lof-title=\"Gr&ouml;&szlig;e &amp; Tiefe\">x</figcaption>",
        );
        let mut collector = sequential();
        collector.collect(&mut doc);

        assert_eq!(collector.items()[0].title, "Figure 1 \u{2013} Network");
        assert_eq!(collector.items()[1].title, "Gr\u{f6}\u{df}e & Tiefe");
        let written = serialize(&doc);
        assert!(written.contains("<p>\u{a9} 2024 \u{2014} ACME</p>"));
        assert!(written.contains("Figure 1 \u{2013} Network</figcaption>"));
        assert!(!written.contains("&amp;copy;"));
    }

    #[test]
    fn title_fallback_includes_script_text_like_text_content() {
        let mut doc = parse("<figcaption>Plot <script>if (a < b) { draw(); }</script></figcaption>");
        let mut collector = sequential();
        collector.collect(&mut doc);

        assert_eq!(collector.items()[0].title, "Plot if (a < b) { draw(); }");
        assert_eq!(
            serialize(&doc),
            "<figcaption id=\"figure-1\">Plot <script>if (a < b) { draw(); }</script></figcaption>"
        );
    }

    #[test]
    fn non_ascii_captions_are_written_back_unchanged() {
        let source = "<figcaption>Abbildung 3 \u{2013} Gr\u{f6}\u{df}e&nbsp;\u{65e5}\u{672c}</figcaption>";
        let mut doc = parse(source);
        let mut collector = sequential();
        collector.collect(&mut doc);

        assert_eq!(
            collector.items()[0].title,
            "Abbildung 3 \u{2013} Gr\u{f6}\u{df}e\u{a0}\u{65e5}\u{672c}"
        );
        assert_eq!(
            serialize(&doc),
            source.replace("<figcaption>", "<figcaption id=\"figure-1\">")
        );
    }

    #[test]
    fn generated_ids_skip_ids_already_in_document() {
        let mut doc =
            parse("<p id=figure-1></p><figcaption>A</figcaption><figcaption>B</figcaption>");
        let mut collector = sequential();
        collector.collect(&mut doc);

        let ids = collector
            .items()
            .iter()
            .map(|item| item.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["figure-2", "figure-3"]);
    }

    struct ConstantIds;

    impl IdGenerator for ConstantIds {
        fn next_id(&mut self) -> String {
            "same".to_owned()
        }
    }

    #[test]
    fn stuck_generator_still_terminates() {
        let mut doc = parse("<figcaption>A</figcaption><figcaption>B</figcaption>");
        let mut collector =
            ItemCollector::with_id_generator(CollectorConfig::default(), ConstantIds);
        collector.collect(&mut doc);
        assert_eq!(collector.items().len(), 2);
    }

    #[test]
    fn custom_marker_and_title_attribute() {
        let mut doc = parse("<caption data-title=\"T1\">one</caption><figcaption>ignored</figcaption>");
        let config = CollectorConfig {
            marker_tag: "caption".to_owned(),
            title_attribute: "data-title".to_owned(),
            wrapper_tag: "nav".to_owned(),
            ..CollectorConfig::default()
        };
        let mut collector = ItemCollector::with_id_generator(config, SequentialIds::new("tbl"));
        collector.collect(&mut doc);

        assert_eq!(collector.items().len(), 1);
        assert_eq!(collector.items()[0].title, "T1");
        assert_eq!(collector.items()[0].id, "tbl-1");
        let rendered = collector.render(|items| items.iter().map(|i| i.href.clone()).collect());
        assert_eq!(
            rendered.map(|r| (r.tag, r.children)),
            Some(("nav".to_owned(), vec!["#tbl-1".to_owned()]))
        );
    }

    #[test]
    fn items_serialize_to_json() {
        let mut doc = parse("<figcaption id=f1 class=wide>Plot</figcaption>");
        let mut collector = sequential();
        collector.collect(&mut doc);

        let json = serde_json::to_value(collector.items()).expect("items serialize");
        assert_eq!(
            json,
            serde_json::json!([{
                "id": "f1",
                "href": "#f1",
                "title": "Plot",
                "attrs": { "class": "wide", "id": "f1" }
            }])
        );
    }
}
