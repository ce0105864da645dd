use chatmap_protocol::{FocusRequest, NodeDescriptor, RecordDetail, ViewFrame};

/// Whether the renderer already holds the new node set when `render` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAck {
    /// Post-render hook runs right away
    Confirmed,
    /// Host calls `ChatSession::on_rendered` once drawing settles
    Deferred,
}

/// Consumer of projected frames.
pub trait GraphRenderer: Send {
    /// Clear and replace everything on screen.
    fn render(&mut self, frame: &ViewFrame) -> RenderAck;

    /// Redraw one node in place (favorite color change).
    fn update_node(&mut self, node: &NodeDescriptor);

    fn focus_camera(&mut self, request: &FocusRequest);
}

/// Detail panel for the selected record.
pub trait DetailSurface: Send {
    fn show(&mut self, detail: Option<&RecordDetail>);
}

/// Renderer for headless hosts; acknowledges every frame immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl GraphRenderer for NullRenderer {
    fn render(&mut self, _frame: &ViewFrame) -> RenderAck {
        RenderAck::Confirmed
    }

    fn update_node(&mut self, _node: &NodeDescriptor) {}

    fn focus_camera(&mut self, _request: &FocusRequest) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetail;

impl DetailSurface for NullDetail {
    fn show(&mut self, _detail: Option<&RecordDetail>) {}
}
