use crate::reconcile::VisibleSet;
use crate::store::RecordStore;
use chatmap_protocol::{CameraAnimation, FocusRequest};
use serde::{Deserialize, Serialize};

/// Camera parameters for the two focus modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub first_draw_scale: f64,
    pub steady_scale: f64,
    pub animation_ms: u64,
    pub easing: String,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            first_draw_scale: 1.0,
            steady_scale: 1.0,
            animation_ms: 1000,
            easing: "easeInOutQuad".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPhase {
    /// Waiting for the first render after a full load
    FirstDraw,
    Steady,
}

/// Decides when and where the camera moves after a render.
#[derive(Debug, Clone)]
pub struct FocusController {
    phase: FocusPhase,
    config: FocusConfig,
}

impl Default for FocusController {
    fn default() -> Self {
        Self::new(FocusConfig::default())
    }
}

impl FocusController {
    pub fn new(config: FocusConfig) -> Self {
        Self {
            phase: FocusPhase::FirstDraw,
            config,
        }
    }

    pub fn phase(&self) -> FocusPhase {
        self.phase
    }

    /// Back to `FirstDraw`; called on every full data load.
    pub fn reset(&mut self) {
        self.phase = FocusPhase::FirstDraw;
    }

    /// Post-render hook, invoked once the renderer holds the node set.
    ///
    /// First draw: jump to `default_focus` if visible, then switch to `Steady` whether or
    /// not a focus was issued. Steady: animate to the first effective root, only when
    /// `refocus` was requested for this cycle and something is visible.
    pub fn after_render(
        &mut self,
        store: &RecordStore,
        visible: &VisibleSet,
        default_focus: Option<&str>,
        refocus: bool,
    ) -> Option<FocusRequest> {
        match self.phase {
            FocusPhase::FirstDraw => {
                self.phase = FocusPhase::Steady;
                let target = default_focus.filter(|id| visible.contains_id(store, id))?;
                Some(FocusRequest {
                    target_id: target.to_string(),
                    scale: self.config.first_draw_scale,
                    animation: None,
                })
            }
            FocusPhase::Steady => {
                if !refocus || visible.is_empty() {
                    return None;
                }
                let root = effective_root(store, visible)?;
                let record = store.get(root)?;
                Some(FocusRequest {
                    target_id: record.id.clone(),
                    scale: self.config.steady_scale,
                    animation: Some(CameraAnimation {
                        duration_ms: self.config.animation_ms,
                        easing: self.config.easing.clone(),
                    }),
                })
            }
        }
    }
}

/// First visible record (load order) whose parent is absent or not visible.
pub fn effective_root(store: &RecordStore, visible: &VisibleSet) -> Option<usize> {
    visible.iter().find(|&idx| {
        store
            .parent_of(idx)
            .map_or(true, |parent| !visible.contains(parent))
    })
}
