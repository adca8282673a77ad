use serde::{Deserialize, Serialize};

pub const MIN_ZOOM_PERCENT: u16 = 10;
pub const MAX_ZOOM_PERCENT: u16 = 1600;
const ZOOM_STEP_PERCENT: u16 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Select,
    Text,
    Draw,
    Highlight,
    Note,
    Image,
    Signature,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomMode {
    Percent,
    FitPage,
    FitWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub tool: Tool,
    pub zoom_mode: ZoomMode,
    pub zoom_percent: u16,
    /// 1-based number of the page the user is working on.
    pub current_page: u32,
    pub page_count: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { tool: Tool::Select, zoom_mode: ZoomMode::FitPage, zoom_percent: 100, current_page: 1, page_count: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    SetTool(Tool),
    SetZoomMode(ZoomMode),
    SetZoomPercent(u16),
    ZoomIn,
    ZoomOut,
    ActualSize,
    SetCurrentPage(u32),
    NextPage,
    PreviousPage,
    /// The document's page count changed underneath the view.
    PagesChanged { page_count: u32 },
}

pub fn apply_view_action(state: &mut ViewState, action: ViewAction) {
    match action {
        ViewAction::SetTool(tool) => state.tool = tool,
        ViewAction::SetZoomMode(mode) => state.zoom_mode = mode,
        ViewAction::SetZoomPercent(zoom_percent) => set_zoom(state, zoom_percent),
        ViewAction::ZoomIn => set_zoom(state, state.zoom_percent.saturating_add(ZOOM_STEP_PERCENT)),
        ViewAction::ZoomOut => set_zoom(state, state.zoom_percent.saturating_sub(ZOOM_STEP_PERCENT)),
        ViewAction::ActualSize => set_zoom(state, 100),
        ViewAction::SetCurrentPage(page) => {
            state.current_page = page.max(1).min(state.page_count.max(1));
        }
        ViewAction::NextPage => {
            state.current_page = (state.current_page + 1).min(state.page_count.max(1));
        }
        ViewAction::PreviousPage => {
            state.current_page = state.current_page.saturating_sub(1).max(1);
        }
        ViewAction::PagesChanged { page_count } => {
            state.page_count = page_count;
            state.current_page = state.current_page.max(1).min(page_count.max(1));
        }
    }
}

fn set_zoom(state: &mut ViewState, zoom_percent: u16) {
    state.zoom_mode = ZoomMode::Percent;
    state.zoom_percent = zoom_percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_percent_is_clamped() {
        let mut state = ViewState::default();

        apply_view_action(&mut state, ViewAction::SetZoomPercent(1));
        assert_eq!(state.zoom_percent, 10);

        apply_view_action(&mut state, ViewAction::SetZoomPercent(9999));
        assert_eq!(state.zoom_percent, 1600);

        apply_view_action(&mut state, ViewAction::ZoomIn);
        assert_eq!(state.zoom_percent, 1600);
        assert_eq!(state.zoom_mode, ZoomMode::Percent);
    }

    #[test]
    fn actual_size_forces_manual_percent_at_100() {
        let mut state = ViewState { zoom_mode: ZoomMode::FitWidth, zoom_percent: 66, ..ViewState::default() };
        apply_view_action(&mut state, ViewAction::ActualSize);
        assert_eq!(state.zoom_mode, ZoomMode::Percent);
        assert_eq!(state.zoom_percent, 100);
    }

    #[test]
    fn page_navigation_is_clamped_to_document_bounds() {
        let mut state = ViewState::default();
        apply_view_action(&mut state, ViewAction::PagesChanged { page_count: 3 });

        apply_view_action(&mut state, ViewAction::SetCurrentPage(3));
        apply_view_action(&mut state, ViewAction::NextPage);
        assert_eq!(state.current_page, 3);

        apply_view_action(&mut state, ViewAction::PagesChanged { page_count: 2 });
        assert_eq!(state.current_page, 2);

        apply_view_action(&mut state, ViewAction::SetCurrentPage(0));
        apply_view_action(&mut state, ViewAction::PreviousPage);
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn tool_selection() {
        let mut state = ViewState::default();
        apply_view_action(&mut state, ViewAction::SetTool(Tool::Highlight));
        assert_eq!(state.tool, Tool::Highlight);
    }
}
