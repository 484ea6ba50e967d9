//! Mode state machine: view / add / edit(target) / delete(target).
//!
//! Exactly one mode is live. Every transition returns the messages that
//! dependent overlays need, including on re-entry of the current mode, so
//! a caller can always re-broadcast and get a consistent picture.

use crate::bus::Message;
use iiif_core::annotation::AnnotationView;
use iiif_core::config::ViewerConfig;
use iiif_core::model::{Color, DraftRect, Region};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    #[serde(rename = "")]
    View,
    Add,
    Edit,
    Delete,
}

impl ModeKind {
    /// Parse the host's mode string (`""` is view).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "view" => Some(Self::View),
            "add" => Some(Self::Add),
            "edit" => Some(Self::Edit),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn needs_target(self) -> bool {
        matches!(self, Self::Edit | Self::Delete)
    }
}

/// The draft and target colors a transition needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModePalette {
    pub add: Color,
    pub edit: Color,
    pub delete: Color,
    pub default_region: Region,
}

impl From<&ViewerConfig> for ModePalette {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            add: config.add_color,
            edit: config.edit_color,
            delete: config.delete_color,
            default_region: config.default_region,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModeMachine {
    kind: ModeKind,
    target: Option<AnnotationView>,
    draft: Option<DraftRect>,
    palette: ModePalette,
    pub gate: DeleteGate,
}

impl ModeMachine {
    pub fn new(palette: ModePalette, delete_arm_ms: u64) -> Self {
        Self {
            kind: ModeKind::View,
            target: None,
            draft: None,
            palette,
            gate: DeleteGate::new(delete_arm_ms),
        }
    }

    pub fn kind(&self) -> ModeKind {
        self.kind
    }

    pub fn target(&self) -> Option<&AnnotationView> {
        self.target.as_ref()
    }

    pub fn draft(&self) -> Option<DraftRect> {
        self.draft
    }

    /// The form is read-only while a delete is pending.
    pub fn is_read_only(&self) -> bool {
        self.kind == ModeKind::Delete
    }

    /// Enter `add`, dropping any target and seeding a fresh draft.
    pub fn enter_add(&mut self) -> Vec<Message> {
        self.enter_add_at(self.palette.default_region)
    }

    /// Enter `add` with a draft seeded from `region` (used by duplicate).
    pub fn enter_add_at(&mut self, region: Region) -> Vec<Message> {
        self.gate.disarm();
        self.kind = ModeKind::Add;
        self.target = None;
        self.draft = Some(DraftRect {
            region,
            color: self.palette.add,
        });
        log::debug!("mode → add");
        vec![
            Message::ModeToggle {
                mode: ModeKind::Add,
                annotation: None,
            },
            Message::DraftFrameUpdate { draft: self.draft },
        ]
    }

    /// Switch to `kind`. Edit and delete without a target are dropped and
    /// return no messages.
    pub fn toggle(&mut self, kind: ModeKind, target: Option<AnnotationView>) -> Vec<Message> {
        match kind {
            ModeKind::View => self.leave(),
            ModeKind::Add => self.enter_add(),
            ModeKind::Edit | ModeKind::Delete => {
                let Some(target) = target else {
                    log::debug!("ignoring {kind:?} without a target annotation");
                    return Vec::new();
                };
                self.gate.disarm();
                let color = match kind {
                    ModeKind::Edit => self.palette.edit,
                    _ => self.palette.delete,
                };
                let annotation = Some(target.overlay_id());
                self.draft = Some(DraftRect {
                    region: target.region,
                    color,
                });
                self.target = Some(target);
                self.kind = kind;
                log::debug!("mode → {kind:?} {annotation:?}");
                vec![
                    Message::ModeToggle {
                        mode: kind,
                        annotation,
                    },
                    Message::DraftFrameUpdate { draft: self.draft },
                ]
            }
        }
    }

    /// Back to `view`: clear the target and every overlay.
    pub fn leave(&mut self) -> Vec<Message> {
        self.gate.disarm();
        self.kind = ModeKind::View;
        self.target = None;
        self.draft = None;
        log::debug!("mode → view");
        vec![
            Message::ModeToggle {
                mode: ModeKind::View,
                annotation: None,
            },
            Message::DraftFrameUpdate { draft: None },
            Message::HideFrame,
            Message::DeactivateAnnotation,
        ]
    }

    /// Move the draft while composing. No-op outside add/edit.
    pub fn update_draft(&mut self, region: Region) -> Option<Message> {
        if !matches!(self.kind, ModeKind::Add | ModeKind::Edit) {
            return None;
        }
        let draft = self.draft.as_mut()?;
        if draft.region == region {
            return None;
        }
        draft.region = region;
        Some(Message::DraftFrameUpdate { draft: self.draft })
    }

    /// Re-point the target after a refetch. Leaves to view when the target
    /// disappeared.
    pub fn reconcile_target(&mut self, present: impl Fn(&AnnotationView) -> Option<AnnotationView>) -> Vec<Message> {
        let Some(target) = &self.target else {
            return Vec::new();
        };
        match present(target) {
            Some(fresh) => {
                self.target = Some(fresh);
                Vec::new()
            }
            None => {
                log::debug!("target annotation vanished after refetch");
                self.leave()
            }
        }
    }
}

// ─── Delete confirmation ─────────────────────────────────────────────────

/// Outcome of pressing the delete control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// First press: the confirm control is now armed.
    Armed,
    /// Second press inside the window: run the destructive submit.
    Confirmed,
    /// Nothing happened.
    Inert,
}

/// Two-step delete confirmation with a timeout. Time is passed in by the
/// caller (milliseconds) so the gate stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteGate {
    armed_at: Option<u64>,
    window_ms: u64,
}

impl DeleteGate {
    pub fn new(window_ms: u64) -> Self {
        Self {
            armed_at: None,
            window_ms,
        }
    }

    pub fn is_armed(&self, now_ms: u64) -> bool {
        self.armed_at
            .is_some_and(|at| now_ms.saturating_sub(at) < self.window_ms)
    }

    /// Press the delete button: arms when unarmed or expired, confirms when
    /// armed.
    pub fn press(&mut self, now_ms: u64) -> GateOutcome {
        if self.is_armed(now_ms) {
            self.armed_at = None;
            GateOutcome::Confirmed
        } else {
            self.armed_at = Some(now_ms);
            GateOutcome::Armed
        }
    }

    /// Press the confirm control directly. Inert unless armed.
    pub fn confirm(&mut self, now_ms: u64) -> GateOutcome {
        if self.is_armed(now_ms) {
            self.armed_at = None;
            GateOutcome::Confirmed
        } else {
            self.armed_at = None;
            GateOutcome::Inert
        }
    }

    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    /// When the armed state lapses, for the host's disarm timer.
    pub fn deadline(&self) -> Option<u64> {
        self.armed_at.map(|at| at + self.window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn machine() -> ModeMachine {
        ModeMachine::new(ModePalette::from(&ViewerConfig::default()), 2000)
    }

    fn annotation() -> AnnotationView {
        AnnotationView::parse(
            &json!({"@id": "a1", "on": "https://e.org/c1#xywh=10,20,30,40"}),
            false,
        )
    }

    #[test]
    fn add_seeds_green_default_draft() {
        let mut m = machine();
        let msgs = m.enter_add();
        assert_eq!(m.kind(), ModeKind::Add);
        assert!(m.target().is_none());
        let draft = m.draft().unwrap();
        assert_eq!(draft.region, Region::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(draft.color.to_hex(), "#28A745");
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn edit_reentry_is_idempotent_but_rebroadcasts() {
        let mut m = machine();
        let first = m.toggle(ModeKind::Edit, Some(annotation()));
        let (draft, target) = (m.draft(), m.target().cloned());
        let second = m.toggle(ModeKind::Edit, Some(annotation()));
        assert_eq!(m.draft(), draft);
        assert_eq!(m.target().cloned(), target);
        assert_eq!(first, second);
        assert_eq!(draft.unwrap().color.to_hex(), "#FD7E14");
        assert_eq!(draft.unwrap().region, Region::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn edit_without_target_is_dropped() {
        let mut m = machine();
        assert!(m.toggle(ModeKind::Delete, None).is_empty());
        assert_eq!(m.kind(), ModeKind::View);
    }

    #[test]
    fn delete_makes_form_read_only() {
        let mut m = machine();
        m.toggle(ModeKind::Delete, Some(annotation()));
        assert!(m.is_read_only());
        assert!(m.update_draft(Region::new(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn leaving_clears_everything_and_deactivates() {
        let mut m = machine();
        m.toggle(ModeKind::Edit, Some(annotation()));
        let msgs = m.leave();
        assert_eq!(m.kind(), ModeKind::View);
        assert!(m.draft().is_none());
        assert!(m.target().is_none());
        assert!(msgs.contains(&Message::HideFrame));
        assert!(msgs.contains(&Message::DeactivateAnnotation));
    }

    #[test]
    fn draft_follows_field_edits() {
        let mut m = machine();
        m.enter_add();
        let region = Region::new(5.0, 5.0, 50.0, 50.0);
        assert_eq!(
            m.update_draft(region),
            Some(Message::DraftFrameUpdate {
                draft: Some(DraftRect {
                    region,
                    color: m.palette.add
                })
            })
        );
        assert!(m.update_draft(region).is_none());
    }

    #[test]
    fn mode_strings_parse() {
        assert_eq!(ModeKind::parse(""), Some(ModeKind::View));
        assert_eq!(ModeKind::parse("delete"), Some(ModeKind::Delete));
        assert_eq!(ModeKind::parse("zoom"), None);
        assert_eq!(serde_json::to_value(ModeKind::View).unwrap(), json!(""));
    }

    // ─── Delete gate ─────────────────────────────────────────────────────

    #[test]
    fn single_press_never_confirms() {
        let mut gate = DeleteGate::new(2000);
        assert_eq!(gate.press(0), GateOutcome::Armed);
        assert!(gate.is_armed(1999));
    }

    #[test]
    fn two_presses_inside_window_confirm() {
        let mut gate = DeleteGate::new(2000);
        gate.press(1000);
        assert_eq!(gate.press(2500), GateOutcome::Confirmed);
        assert!(!gate.is_armed(2500));
    }

    #[test]
    fn expiry_requires_two_fresh_presses() {
        let mut gate = DeleteGate::new(2000);
        gate.press(0);
        assert_eq!(gate.press(2000), GateOutcome::Armed);
        assert_eq!(gate.press(2100), GateOutcome::Confirmed);
    }

    #[test]
    fn confirm_while_unarmed_is_inert() {
        let mut gate = DeleteGate::new(2000);
        assert_eq!(gate.confirm(0), GateOutcome::Inert);
        gate.press(0);
        assert_eq!(gate.deadline(), Some(2000));
        assert_eq!(gate.confirm(10), GateOutcome::Confirmed);
    }
}
