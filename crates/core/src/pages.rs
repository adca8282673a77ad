//! Page structure edits and page copies between documents.

use std::collections::HashSet;

use doc_model::{Page, PageId, PageRotation};
use pdf_engine::{read_source, DocumentSource, PdfGraph};

use crate::document_manager::{page_indices, page_size, DocumentManager};
use crate::error::{EditError, EditResult};
use crate::options::{AddPageOptions, PageRange};
use crate::page_walk;

impl DocumentManager {
    /// Inserts a blank page, appending when no position is given.
    pub fn add_page(&mut self, options: AddPageOptions) -> EditResult<Page> {
        self.transact(|graph, document, config| {
            let size = options.size.unwrap_or(config.default_page_size);
            if size.width <= 0.0 || size.height <= 0.0 {
                return Err(EditError::InvalidArgument(format!(
                    "page size {}x{} is not positive",
                    size.width, size.height
                )));
            }
            let index = options.position.unwrap_or(document.page_count());
            if index > document.page_count() {
                return Err(EditError::InvalidArgument(format!(
                    "cannot insert at position {index} (document has {} pages)",
                    document.page_count()
                )));
            }

            graph.insert_page(index, page_size(size))?;
            document.pages.insert(index, Page::new(0, size));
            document.renumber();
            document.mark_dirty();
            log::debug!("inserted page at position {}", index + 1);
            Ok(document.pages[index].clone())
        })
    }

    /// Removes a page together with every entity it owns.
    pub fn delete_page(&mut self, page_id: PageId) -> EditResult<Page> {
        self.transact(|graph, document, _| {
            let index = document.page_index(page_id).ok_or_else(|| EditError::page_not_found(page_id))?;
            if document.page_count() == 1 {
                return Err(EditError::LastPage);
            }

            graph.remove_page(index)?;
            let page = document.remove_page(page_id).ok_or_else(|| EditError::page_not_found(page_id))?;
            document.mark_dirty();
            log::debug!("deleted page {} ({} elements)", index + 1, page.element_count());
            Ok(page)
        })
    }

    /// Turns a page by 90, 180 or 270 degrees and returns its new rotation.
    /// Negative angles turn counter-clockwise, so -90 equals 270.
    pub fn rotate_page(&mut self, page_id: PageId, degrees: i32) -> EditResult<PageRotation> {
        if degrees == 0 || degrees.abs() > 270 {
            return Err(EditError::InvalidArgument(format!(
                "rotation must be between -270 and 270 degrees and not zero, got {degrees}"
            )));
        }
        let delta = PageRotation::from_degrees(degrees)?;

        self.transact(|graph, document, _| {
            let index = document.page_index(page_id).ok_or_else(|| EditError::page_not_found(page_id))?;
            let page = &mut document.pages[index];
            page.rotate_by(delta);
            let rotation = page.rotation;

            graph.set_rotation(index, rotation.degrees())?;
            document.mark_dirty();
            log::debug!("page {} rotated to {} degrees", index + 1, rotation.degrees());
            Ok(rotation)
        })
    }

    /// Puts the pages in the given order. `order` must name every current
    /// page exactly once.
    pub fn reorder_pages(&mut self, order: &[PageId]) -> EditResult<()> {
        self.transact(|graph, document, _| {
            let current: HashSet<PageId> = document.pages.iter().map(|page| page.id).collect();
            let requested: HashSet<PageId> = order.iter().copied().collect();
            if order.len() != current.len() || requested != current {
                return Err(EditError::InvalidOrder(format!(
                    "expected the {} current page ids, got {} id(s)",
                    current.len(),
                    order.len()
                )));
            }

            let indices: Vec<usize> = order.iter().filter_map(|id| document.page_index(*id)).collect();
            graph.set_page_order(&indices)?;

            let mut pages = std::mem::take(&mut document.pages);
            let mut reordered = Vec::with_capacity(pages.len());
            for id in order {
                if let Some(position) = pages.iter().position(|page| page.id == *id) {
                    reordered.push(pages.swap_remove(position));
                }
            }
            document.pages = reordered;
            document.renumber();
            document.mark_dirty();
            log::debug!("reordered {} pages", order.len());
            Ok(())
        })
    }

    /// Copies every page of another document in at `at` (0-based; appends
    /// when `None`) and returns the ids of the new pages. Only the imported
    /// pages are read back into the model; existing pages keep their records.
    pub fn merge_document(
        &mut self,
        source: impl Into<DocumentSource>,
        at: Option<usize>,
    ) -> EditResult<Vec<PageId>> {
        let page_count = self.require_document()?.page_count();
        let at = at.unwrap_or(page_count);
        if at > page_count {
            return Err(EditError::InvalidArgument(format!(
                "cannot merge at position {at} (document has {page_count} pages)"
            )));
        }

        let source = source.into();
        let name = source.display_name();
        let load_error = |source| EditError::Load { name: name.clone(), source };
        let other = read_source(source).and_then(|bytes| PdfGraph::decode(&bytes)).map_err(load_error)?;

        let mut graph = self.require_graph()?.clone();
        let mut document = self.require_document()?.clone();
        let indices: Vec<usize> = (0..other.page_count()).collect();
        let imported = graph.import_pages(&other, &indices, at)?;

        let mut pages = Vec::with_capacity(imported.len());
        for offset in 0..imported.len() {
            pages.push(page_walk::walk_page(&graph, self.extractor(), at + offset)?);
        }
        let ids: Vec<PageId> = pages.iter().map(|page| page.id).collect();
        document.pages.splice(at..at, pages);
        document.renumber();
        document.mark_dirty();

        self.commit(graph, document)?;
        log::info!("merged {} page(s) from {name} at position {}", ids.len(), at + 1);
        Ok(ids)
    }

    /// Builds one standalone graph per range. The open document is left as
    /// it is.
    pub fn split_document(&self, ranges: &[PageRange]) -> EditResult<Vec<PdfGraph>> {
        if ranges.is_empty() {
            return Err(EditError::InvalidArgument("no page ranges given".to_owned()));
        }
        let graph = self.require_graph()?;

        let parts = ranges
            .iter()
            .map(|range| {
                let numbers: Vec<u32> = range.numbers().collect();
                let indices = page_indices(&numbers, graph.page_count())?;
                Ok(graph.subset(&indices)?)
            })
            .collect::<EditResult<Vec<_>>>()?;
        log::info!("split into {} part(s)", parts.len());
        Ok(parts)
    }

    /// A standalone graph holding the given 1-based pages in the given order.
    pub fn extract_pages(&self, numbers: &[u32]) -> EditResult<PdfGraph> {
        let graph = self.require_graph()?;
        let indices = page_indices(numbers, graph.page_count())?;
        Ok(graph.subset(&indices)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Size, Entity};
    use proptest::prelude::*;

    use crate::config::EditorConfig;
    use crate::options::{SaveOptions, TextOptions};
    use pdf_engine::{ContentTextExtractor, TextExtractor};

    fn manager_with(pages: usize) -> DocumentManager {
        let mut manager = DocumentManager::new(EditorConfig::default());
        manager.create_new(pages).expect("document created");
        manager
    }

    fn page_ids(manager: &DocumentManager) -> Vec<PageId> {
        manager.document().expect("document").pages.iter().map(|page| page.id).collect()
    }

    fn numbers(manager: &DocumentManager) -> Vec<u32> {
        manager.document().expect("document").pages.iter().map(|page| page.number).collect()
    }

    #[test]
    fn pages_insert_at_position() {
        let mut manager = manager_with(2);
        let options = AddPageOptions { size: Some(Size::new(300.0, 400.0)), position: Some(0) };
        let page = manager.add_page(options).expect("page");
        assert_eq!(page.number, 1);
        assert_eq!(numbers(&manager), vec![1, 2, 3]);
        assert_eq!(manager.graph().expect("graph").page_size(0).expect("size").width_pt, 300.0);

        let options = AddPageOptions { position: Some(9), ..AddPageOptions::default() };
        assert!(matches!(manager.add_page(options), Err(EditError::InvalidArgument(_))));
    }

    #[test]
    fn last_page_cannot_be_deleted() {
        let mut manager = manager_with(1);
        let page_id = page_ids(&manager)[0];
        assert!(matches!(manager.delete_page(page_id), Err(EditError::LastPage)));
        assert_eq!(manager.document().expect("document").page_count(), 1);
        assert!(!manager.document().expect("document").dirty);
    }

    #[test]
    fn unknown_page_is_reported_before_last_page() {
        let mut manager = manager_with(1);
        let err = manager.delete_page(PageId::new_v4()).expect_err("unknown page");
        assert!(matches!(err, EditError::NotFound { kind: "page", .. }));
    }

    #[test]
    fn deleting_a_page_cascades_to_its_elements() {
        let mut manager = manager_with(2);
        let ids = page_ids(&manager);
        manager.add_text(ids[0], TextOptions::new("gone", 10.0, 10.0)).expect("text");
        manager.add_text(ids[1], TextOptions::new("kept", 10.0, 10.0)).expect("text");

        let removed = manager.delete_page(ids[0]).expect("delete");
        assert_eq!(removed.texts.len(), 1);
        let document = manager.document().expect("document");
        assert_eq!(document.page_count(), 1);
        assert_eq!(document.pages[0].number, 1);
        assert_eq!(document.pages[0].texts[0].content, "kept");
        assert_eq!(manager.graph().expect("graph").page_count(), 1);
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let mut manager = manager_with(1);
        let page_id = page_ids(&manager)[0];
        assert_eq!(manager.rotate_page(page_id, 90).expect("rotate"), PageRotation::Deg90);

        let page = &manager.document().expect("document").pages[0];
        assert_eq!(page.size(), Size::new(792.0, 612.0));
        assert_eq!(manager.graph().expect("graph").rotation(0).expect("rotation"), 90);
        assert!(matches!(manager.rotate_page(page_id, 45), Err(EditError::InvalidArgument(_))));
    }

    #[test]
    fn rotation_accepts_only_real_turns() {
        let mut manager = manager_with(1);
        let page_id = page_ids(&manager)[0];

        for degrees in [0, 360, 450, -360, 720] {
            let err = manager.rotate_page(page_id, degrees).expect_err("not a turn");
            assert!(matches!(err, EditError::InvalidArgument(_)), "{degrees} gave {err:?}");
        }
        assert_eq!(manager.graph().expect("graph").rotation(0).expect("rotation"), 0);
        assert!(!manager.document().expect("document").dirty);

        assert_eq!(manager.rotate_page(page_id, -90).expect("counter-clockwise"), PageRotation::Deg270);
        assert_eq!(manager.rotate_page(page_id, 180).expect("half turn"), PageRotation::Deg90);
        assert_eq!(manager.rotate_page(page_id, 270).expect("three quarters"), PageRotation::Deg0);
    }

    #[test]
    fn reorder_rejects_mismatched_lists() {
        let mut manager = manager_with(3);
        let ids = page_ids(&manager);

        for order in [vec![ids[0], ids[1]], vec![ids[0], ids[1], ids[1]], vec![ids[0], ids[1], ids[2], ids[2]]] {
            assert!(matches!(manager.reorder_pages(&order), Err(EditError::InvalidOrder(_))));
        }
        assert!(matches!(
            manager.reorder_pages(&[ids[0], ids[1], PageId::new_v4()]),
            Err(EditError::InvalidOrder(_))
        ));
        assert_eq!(page_ids(&manager), ids);
    }

    #[test]
    fn merge_appends_walked_pages() {
        let mut other = manager_with(2);
        let other_first = page_ids(&other)[0];
        other.add_text(other_first, TextOptions::new("Appendix", 72.0, 72.0)).expect("text");
        let bytes = other.save(&SaveOptions::default()).expect("save");

        let mut manager = manager_with(1);
        let first = page_ids(&manager)[0];
        let merged = manager.merge_document(bytes, Some(0)).expect("merge");
        assert_eq!(merged.len(), 2);

        let document = manager.document().expect("document");
        assert_eq!(numbers(&manager), vec![1, 2, 3]);
        assert_eq!(document.pages[2].id, first);
        assert_eq!(document.pages[0].texts[0].content, "Appendix");
        assert_eq!(manager.graph().expect("graph").page_count(), 3);
    }

    #[test]
    fn merge_keeps_existing_elements_editable() {
        let mut other = manager_with(1);
        let other_first = page_ids(&other)[0];
        other.add_text(other_first, TextOptions::new("Imported", 72.0, 72.0)).expect("text");
        let bytes = other.save(&SaveOptions::default()).expect("save");

        let mut manager = manager_with(1);
        let first = page_ids(&manager)[0];
        let placed = manager.add_text(first, TextOptions::new("Placed", 72.0, 72.0)).expect("placed");
        manager.merge_document(bytes, None).expect("merge");

        let document = manager.document().expect("document");
        assert_eq!(document.pages[0].texts, vec![placed.clone()]);
        let imported = document.pages[1].texts[0].clone();
        assert!(imported.origin.is_some());

        manager.delete_element(placed.id).expect("placed text still resolves");
        manager.delete_element(imported.id).expect("imported text is backed by its stream");
        let graph = manager.graph().expect("graph");
        for index in 0..2 {
            assert!(ContentTextExtractor.text_runs(graph, index).expect("runs").is_empty());
        }
    }

    #[test]
    fn merge_of_garbage_leaves_document_alone() {
        let mut manager = manager_with(1);
        let err = manager.merge_document(b"junk".to_vec(), None).expect_err("bad merge");
        assert!(matches!(err, EditError::Load { .. }));
        assert_eq!(manager.document().expect("document").page_count(), 1);
    }

    #[test]
    fn split_and_extract_build_standalone_graphs() {
        let manager = manager_with(4);
        let parts = manager
            .split_document(&[PageRange::new(1, 2), PageRange::new(3, 4)])
            .expect("split");
        assert_eq!(parts.iter().map(PdfGraph::page_count).collect::<Vec<_>>(), vec![2, 2]);
        assert!(matches!(manager.split_document(&[PageRange::new(3, 5)]), Err(EditError::InvalidArgument(_))));

        let extracted = manager.extract_pages(&[4, 1]).expect("extract");
        assert_eq!(extracted.page_count(), 2);
        assert_eq!(manager.document().expect("document").page_count(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn numbering_stays_contiguous(pages in 1usize..6, inserts in proptest::collection::vec(0usize..8, 0..4)) {
            let mut manager = manager_with(pages);
            for position in inserts {
                let count = manager.document().expect("document").page_count();
                let options = AddPageOptions { position: Some(position.min(count)), ..AddPageOptions::default() };
                manager.add_page(options).expect("page");
            }
            let numbers = numbers(&manager);
            let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
            prop_assert_eq!(numbers, expected);
        }

        #[test]
        fn four_quarter_turns_restore_the_page(turn in prop_oneof![Just(90), Just(-90), Just(270)]) {
            let mut manager = manager_with(1);
            let page_id = page_ids(&manager)[0];
            for _ in 0..4 {
                manager.rotate_page(page_id, turn).expect("rotate");
            }
            let page = &manager.document().expect("document").pages[0];
            prop_assert_eq!(page.size(), Size::new(612.0, 792.0));
            prop_assert_eq!(page.rotation, PageRotation::Deg0);
        }

        #[test]
        fn reorder_keeps_entity_ownership(order in Just(vec![0usize, 1, 2, 3]).prop_shuffle()) {
            let mut manager = manager_with(4);
            let ids = page_ids(&manager);
            for (index, page_id) in ids.iter().enumerate() {
                manager.add_text(*page_id, TextOptions::new(format!("page {index}"), 10.0, 10.0)).expect("text");
            }

            let requested: Vec<PageId> = order.iter().map(|index| ids[*index]).collect();
            manager.reorder_pages(&requested).expect("reorder");

            let document = manager.document().expect("document");
            prop_assert_eq!(page_ids(&manager), requested);
            for (position, page) in document.pages.iter().enumerate() {
                prop_assert_eq!(page.number as usize, position + 1);
                let owned = document.entities_on_page(page.id);
                prop_assert_eq!(owned.len(), 1);
                let Entity::Text(text) = &owned[0] else { panic!("text element") };
                prop_assert_eq!(&text.content, &format!("page {}", order[position]));
            }
        }
    }
}
