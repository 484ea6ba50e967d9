//! Typed message bus between the engine and its views.
//!
//! Every cross-component signal is a `Message` variant. The `Dispatcher`
//! broadcasts each message to all subscribers in subscription order and
//! keeps it in an outbox for hosts that poll (the WASM bridge drains the
//! outbox after each call and re-dispatches DOM events).

use crate::mode::ModeKind;
use iiif_core::id::AnnotationId;
use iiif_core::model::{Color, DraftRect, Region};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Message {
    ManifestLoad {
        manifest_id: String,
    },
    UrlSubmit {
        url: String,
    },
    ModeToggle {
        mode: ModeKind,
        annotation: Option<AnnotationId>,
    },
    ShowFrame {
        url: String,
        region: Region,
        color: Color,
    },
    HideFrame,
    DraftFrameUpdate {
        draft: Option<DraftRect>,
    },
    AnnotationAdd,
    AnnotationEdit {
        id: AnnotationId,
    },
    AnnotationDelete {
        id: AnnotationId,
    },
    AnnotationDuplicate {
        id: AnnotationId,
    },
    AnnotationImport {
        count: usize,
    },
    AddAnnotationSubmit {
        id: AnnotationId,
    },
    EditAnnotationSubmit {
        id: AnnotationId,
    },
    DeleteAnnotationSubmit {
        id: AnnotationId,
    },
    RefreshAnnotations,
    HideAllAnnotations,
    ShowAnnotation {
        id: AnnotationId,
    },
    HideAnnotation {
        id: AnnotationId,
    },
    DeactivateAnnotation,
    CanvasChange {
        canvas_index: usize,
    },
    /// The merged collection for the current canvas changed.
    AnnotationsChanged {
        count: usize,
    },
    ShowAlert {
        kind: AlertKind,
        text: String,
    },
}

impl Message {
    /// DOM event name used by the surrounding page.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ManifestLoad { .. } => "manifestload",
            Self::UrlSubmit { .. } => "URLsubmit",
            Self::ModeToggle { .. } => "mode-toggle",
            Self::ShowFrame { .. } => "show-frame",
            Self::HideFrame => "hide-frame",
            Self::DraftFrameUpdate { .. } => "draft-frame-update",
            Self::AnnotationAdd => "annotation-add",
            Self::AnnotationEdit { .. } => "annotation-edit",
            Self::AnnotationDelete { .. } => "annotation-delete",
            Self::AnnotationDuplicate { .. } => "annotation-duplicate",
            Self::AnnotationImport { .. } => "annotation-import",
            Self::AddAnnotationSubmit { .. } => "add-annotation-submit",
            Self::EditAnnotationSubmit { .. } => "edit-annotation-submit",
            Self::DeleteAnnotationSubmit { .. } => "delete-annotation-submit",
            Self::RefreshAnnotations => "refresh-annotations",
            Self::HideAllAnnotations => "hide-all-annotations",
            Self::ShowAnnotation { .. } => "show-annotation",
            Self::HideAnnotation { .. } => "hide-annotation",
            Self::DeactivateAnnotation => "deactivate-annotation",
            Self::CanvasChange { .. } => "canvaschange",
            Self::AnnotationsChanged { .. } => "annotations-changed",
            Self::ShowAlert { .. } => "show-alert",
        }
    }

    pub fn alert(kind: AlertKind, text: impl Into<String>) -> Self {
        Self::ShowAlert {
            kind,
            text: text.into(),
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Message)>;

#[derive(Default)]
pub struct Dispatcher {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    outbox: Vec<Message>,
    next_id: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, f: impl FnMut(&Message) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Broadcast to every subscriber, then queue for polling hosts.
    pub fn emit(&mut self, message: Message) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&message);
        }
        self.outbox.push(message);
    }

    pub fn emit_all(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.emit(message);
        }
    }

    /// Take every message emitted since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending(&self) -> &[Message] {
        &self.outbox
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscribers.len())
            .field("outbox", &self.outbox)
            .finish()
    }
}
