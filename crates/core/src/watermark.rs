//! Watermarks stamped across a page selection.

use doc_model::{AppliedWatermark, EntityId, Watermark, WatermarkContent};
use pdf_engine::{encode_win_ansi, image_ops, text_ops, ObjectId, TextPaint};
use uuid::Uuid;

use crate::document_manager::DocumentManager;
use crate::elements::{effective_opacity, rgb, standard_font};
use crate::error::{EditError, EditResult};
use crate::options::WatermarkOptions;

impl DocumentManager {
    /// Paints the watermark on every selected page, each page in its own
    /// content stream.
    pub fn add_watermark(&mut self, options: WatermarkOptions) -> EditResult<Watermark> {
        if !(0.0..=1.0).contains(&options.opacity) {
            return Err(EditError::InvalidArgument(format!("opacity {} is outside 0..=1", options.opacity)));
        }
        match &options.content {
            WatermarkContent::Text { text, font_size, .. } if text.is_empty() || *font_size <= 0.0 => {
                return Err(EditError::InvalidArgument("watermark text needs content and a positive size".to_owned()));
            }
            WatermarkContent::Image { width, height, .. } if *width <= 0.0 || *height <= 0.0 => {
                return Err(EditError::InvalidArgument("watermark image size must be positive".to_owned()));
            }
            _ => {}
        }

        self.transact(|graph, document, _| {
            let indices = options.pages.resolve(document.page_count());
            if indices.is_empty() {
                return Err(EditError::InvalidArgument(format!("{:?} selects no pages", options.pages)));
            }

            let content_size = options.content.approximate_size();
            let mut shared_image: Option<(String, ObjectId)> = None;
            let mut applied = Vec::with_capacity(indices.len());
            for index in indices {
                let page = &document.pages[index];
                let page_id = page.id;
                let anchor = options.position.anchor(page.size(), content_size).offset(options.offset_x, options.offset_y);

                let ops = match &options.content {
                    WatermarkContent::Text { text, font, font_size, color } => {
                        let font_resource = graph.font_resource(index, standard_font(*font))?;
                        let ext_gstate = graph.ext_gstate(index, effective_opacity(options.opacity, *color))?;
                        text_ops(&TextPaint {
                            font_resource,
                            font_size: *font_size,
                            color: rgb(*color),
                            x: anchor.x,
                            y: anchor.y,
                            rotation: options.rotation,
                            text: encode_win_ansi(text),
                            ext_gstate,
                        })
                    }
                    WatermarkContent::Image { data, width, height } => {
                        let resource = match &shared_image {
                            Some((name, id)) => {
                                graph.share_xobject(index, name, *id)?;
                                name.clone()
                            }
                            None => {
                                let (name, embedded) =
                                    graph.image_resource(index, data).map_err(EditError::embed("watermark"))?;
                                shared_image = Some((name.clone(), embedded.id));
                                name
                            }
                        };
                        let ext_gstate = graph.ext_gstate(index, options.opacity)?;
                        image_ops(&resource, anchor.x, anchor.y, *width, *height, options.rotation, ext_gstate.as_deref())
                    }
                };

                let stream = graph.append_content(index, ops)?;
                applied.push(AppliedWatermark { page_id, graph_ref: stream.into() });
            }

            let watermark = Watermark {
                id: Uuid::new_v4(),
                content: options.content,
                pages: options.pages,
                position: options.position,
                rotation: options.rotation,
                opacity: options.opacity,
                offset_x: options.offset_x,
                offset_y: options.offset_y,
                applied,
            };
            document.watermarks.push(watermark.clone());
            document.mark_dirty();
            log::debug!("watermark {} painted on {} page(s)", watermark.id, watermark.applied.len());
            Ok(watermark)
        })
    }

    /// Takes a watermark off every page it was painted on.
    pub fn remove_watermark(&mut self, id: EntityId) -> EditResult<Watermark> {
        self.transact(|graph, document, _| {
            let position = document
                .watermarks
                .iter()
                .position(|watermark| watermark.id == id)
                .ok_or(EditError::NotFound { kind: "watermark", id })?;
            let watermark = document.watermarks.remove(position);

            for applied in &watermark.applied {
                let Some(index) = document.page_index(applied.page_id) else {
                    continue;
                };
                if !graph.remove_content(index, applied.graph_ref.into())? {
                    log::warn!("watermark stream {:?} was already gone", applied.graph_ref);
                }
            }
            document.mark_dirty();
            Ok(watermark)
        })
    }
}
