//! Async drivers: run the viewer's plans against a `Transport`.
//!
//! The viewer lives in a `RefCell` on a single thread. A driver borrows it
//! only between awaits, never across one, so any other event handler can
//! run while a request is outstanding. Results are handed back through the
//! viewer's own guards (generation, liveness), which drop anything stale.

use crate::repository::FetchPlan;
use crate::transport::{Transport, get_json};
use crate::viewer::{FollowUp, Submission, Viewer};
use iiif_core::error::Result;
use std::cell::RefCell;

/// `URLsubmit`: fetch, validate, and install a manifest, then load the
/// first canvas's annotations.
pub async fn open_manifest<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, url: &str) -> Result<()> {
    viewer.borrow_mut().announce_url(url);
    let doc = match get_json(transport, url).await {
        Ok(doc) => doc,
        Err(e) => {
            viewer.borrow_mut().manifest_fetch_failed(&e);
            return Err(e);
        }
    };
    if !viewer.borrow().is_alive() {
        return Ok(());
    }
    let plan = viewer.borrow_mut().load_manifest_value(doc, Some(url.to_string()))?;
    run_plan(viewer, transport, plan).await;
    Ok(())
}

/// Execute a fetch plan. Returns whether the result was applied.
pub async fn run_plan<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, plan: FetchPlan) -> bool {
    let FetchPlan::Fetch { ticket, url } = plan else {
        return true;
    };
    let result = get_json(transport, &url).await;
    viewer.borrow_mut().complete_fetch(&ticket, result)
}

/// `canvaschange`.
pub async fn change_canvas<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, index: usize) -> bool {
    let plan = viewer.borrow_mut().set_canvas(index);
    match plan {
        Some(plan) => run_plan(viewer, transport, plan).await,
        None => false,
    }
}

/// `refresh-annotations`.
pub async fn refresh<T: Transport>(viewer: &RefCell<Viewer>, transport: &T) -> bool {
    let plan = viewer.borrow_mut().refresh();
    match plan {
        Some(plan) => run_plan(viewer, transport, plan).await,
        None => false,
    }
}

/// Submit the form (add, edit, or a delete press). Resolves to whether the
/// change is now recorded: always `true` for local-only routes, the
/// gateway's answer for remote ones. `Ok(false)` also covers an armed but
/// unconfirmed delete.
pub async fn submit<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, now_ms: u64) -> Result<bool> {
    let submission = viewer.borrow_mut().submit(now_ms)?;
    match submission {
        Some(submission) => Ok(persist(viewer, transport, submission).await),
        None => Ok(false),
    }
}

/// The delete confirm control.
pub async fn confirm_delete<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, now_ms: u64) -> bool {
    let submission = viewer.borrow_mut().confirm_delete(now_ms);
    match submission {
        Some(submission) => persist(viewer, transport, submission).await,
        None => false,
    }
}

/// `annotation-import`. Returns how many annotations were recorded.
pub async fn import<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, text: &str, now_ms: u64) -> Result<usize> {
    let submissions = viewer.borrow_mut().import_annotations(text, now_ms)?;
    let mut recorded = 0;
    for submission in submissions {
        if persist(viewer, transport, submission).await {
            recorded += 1;
        }
    }
    Ok(recorded)
}

/// Send a remote submission and reconcile. Local-only submissions are
/// already applied.
async fn persist<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, submission: Submission) -> bool {
    let Some(request) = &submission.request else {
        return true;
    };
    let gateway = viewer.borrow().gateway().clone();
    let ok = gateway.send(transport, request).await;
    let follow_up = viewer.borrow_mut().finish_submission(&submission, ok);
    match follow_up {
        Some(FollowUp::RefetchManifest(url)) => refetch_manifest(viewer, transport, &url).await,
        Some(FollowUp::Refresh(plan)) => {
            run_plan(viewer, transport, plan).await;
        }
        None => {}
    }
    ok
}

/// Reload the manifest after a confirmed write; on failure fall back to a
/// plain refresh of the current canvas.
async fn refetch_manifest<T: Transport>(viewer: &RefCell<Viewer>, transport: &T, url: &str) {
    let plan = match get_json(transport, url).await {
        Ok(doc) => viewer.borrow_mut().reload_manifest(doc),
        Err(e) => Err(e),
    };
    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => {
            log::warn!("manifest refetch from {url} failed: {e}");
            viewer.borrow_mut().refresh()
        }
    };
    if let Some(plan) = plan {
        run_plan(viewer, transport, plan).await;
    }
}
