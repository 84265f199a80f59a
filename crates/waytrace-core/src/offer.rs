//! Clipboard and drag-and-drop offer lifecycle
//!
//! The compositor hands the client one `wl_data_offer` per advertised
//! transfer and expects the client to destroy it once it goes out of use.
//! [`OfferTracker`] keeps at most one live handle per category (clipboard
//! selection, active drag) in an explicit slot; storing a new handle
//! destroys the previous occupant in the same step, so a handle can be
//! neither leaked nor destroyed twice.

use tracing::debug;

/// Drag-and-drop action bits, mirroring `wl_data_device_manager.dnd_action`.
pub const DND_ACTION_COPY: u32 = 1;
pub const DND_ACTION_MOVE: u32 = 2;
pub const DND_ACTION_ASK: u32 = 4;

/// Mime type provisionally accepted on drag entry. The original behavior:
/// accept text/plain without inspecting the advertised types. The accept is
/// a handshake placeholder, not a promise to fetch the data.
const PLACEHOLDER_MIME: &str = "text/plain";

/// Transport-side data-offer proxy as seen by the tracker.
///
/// The wayland proxy type implements this in the binary; tests use a
/// counting mock. All calls are fire-and-forget against the transport.
pub trait OfferHandle {
    /// Protocol id, used in log lines.
    fn id(&self) -> u32;
    /// Accept (or retract, with `None`) one mime type for a drag serial.
    fn accept(&self, serial: u32, mime_type: Option<&str>);
    /// Negotiate permitted and preferred drag actions.
    fn set_actions(&self, actions: u32, preferred: u32);
    /// Tell the server the offer is no longer in use.
    fn destroy(&self);
}

pub struct OfferTracker<H: OfferHandle> {
    selection: Option<H>,
    drag: Option<H>,
}

impl<H: OfferHandle> Default for OfferTracker<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: OfferHandle> OfferTracker<H> {
    pub fn new() -> Self {
        Self { selection: None, drag: None }
    }

    /// Replace the clipboard selection. `None` means the clipboard was
    /// cleared. The previous offer, if any, is destroyed.
    pub fn selection_changed(&mut self, offer: Option<H>) {
        if let Some(old) = self.selection.take() {
            debug!(id = old.id(), "destroying superseded selection offer");
            old.destroy();
        }
        self.selection = offer;
    }

    /// A drag entered the surface: take ownership of the offer, negotiate
    /// actions (copy, move or ask, preferring copy) and issue the
    /// placeholder accept.
    pub fn drag_entered(&mut self, offer: H, serial: u32) {
        offer.set_actions(
            DND_ACTION_COPY | DND_ACTION_MOVE | DND_ACTION_ASK,
            DND_ACTION_COPY,
        );
        offer.accept(serial, Some(PLACEHOLDER_MIME));
        if let Some(old) = self.drag.take() {
            debug!(id = old.id(), "destroying stale drag offer");
            old.destroy();
        }
        self.drag = Some(offer);
    }

    /// The drag left the surface. A drop may already have cleared the
    /// slot, in which case this is a no-op.
    pub fn drag_left(&mut self) {
        if let Some(offer) = self.drag.take() {
            offer.destroy();
        }
    }

    /// The drag was dropped. The handshake succeeded but the payload is
    /// never fetched, so the offer is destroyed immediately.
    pub fn drag_dropped(&mut self) {
        if let Some(offer) = self.drag.take() {
            offer.destroy();
        }
    }

    pub fn selection(&self) -> Option<&H> {
        self.selection.as_ref()
    }

    pub fn drag(&self) -> Option<&H> {
        self.drag.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Calls {
        destroys: u32,
        accepts: Vec<(u32, Option<String>)>,
        actions: Vec<(u32, u32)>,
    }

    #[derive(Debug, Clone)]
    struct MockOffer {
        id: u32,
        calls: Rc<RefCell<Calls>>,
    }

    impl MockOffer {
        fn new(id: u32) -> Self {
            Self { id, calls: Rc::new(RefCell::new(Calls::default())) }
        }

        fn destroys(&self) -> u32 {
            self.calls.borrow().destroys
        }
    }

    impl OfferHandle for MockOffer {
        fn id(&self) -> u32 {
            self.id
        }

        fn accept(&self, serial: u32, mime_type: Option<&str>) {
            self.calls.borrow_mut().accepts.push((serial, mime_type.map(String::from)));
        }

        fn set_actions(&self, actions: u32, preferred: u32) {
            self.calls.borrow_mut().actions.push((actions, preferred));
        }

        fn destroy(&self) {
            self.calls.borrow_mut().destroys += 1;
        }
    }

    #[test]
    fn test_selection_replacement_destroys_prior_once() {
        let mut tracker = OfferTracker::new();
        let a = MockOffer::new(1);
        let b = MockOffer::new(2);

        tracker.selection_changed(Some(a.clone()));
        tracker.selection_changed(Some(b.clone()));

        assert_eq!(a.destroys(), 1);
        assert_eq!(b.destroys(), 0);
        assert_eq!(tracker.selection().unwrap().id(), 2);
    }

    #[test]
    fn test_selection_cleared() {
        let mut tracker = OfferTracker::new();
        let a = MockOffer::new(1);

        tracker.selection_changed(Some(a.clone()));
        tracker.selection_changed(None);

        assert_eq!(a.destroys(), 1);
        assert!(tracker.selection().is_none());
    }

    #[test]
    fn test_drag_entry_negotiates_and_accepts() {
        let mut tracker = OfferTracker::new();
        let offer = MockOffer::new(3);

        tracker.drag_entered(offer.clone(), 42);

        let calls = offer.calls.borrow();
        assert_eq!(
            calls.actions,
            vec![(DND_ACTION_COPY | DND_ACTION_MOVE | DND_ACTION_ASK, DND_ACTION_COPY)]
        );
        assert_eq!(calls.accepts, vec![(42, Some("text/plain".to_string()))]);
        assert_eq!(calls.destroys, 0);
    }

    #[test]
    fn test_drop_then_leave_is_idempotent() {
        let mut tracker = OfferTracker::new();
        let offer = MockOffer::new(4);

        tracker.drag_entered(offer.clone(), 1);
        tracker.drag_dropped();
        assert_eq!(offer.destroys(), 1);
        assert!(tracker.drag().is_none());

        // The compositor sends leave after drop; the slot is already empty.
        tracker.drag_left();
        assert_eq!(offer.destroys(), 1);
    }

    #[test]
    fn test_drag_leave_destroys_active_offer() {
        let mut tracker = OfferTracker::new();
        let offer = MockOffer::new(5);

        tracker.drag_entered(offer.clone(), 1);
        tracker.drag_left();

        assert_eq!(offer.destroys(), 1);
        assert!(tracker.drag().is_none());
    }

    #[test]
    fn test_new_drag_destroys_stale_handle() {
        let mut tracker = OfferTracker::new();
        let stale = MockOffer::new(6);
        let fresh = MockOffer::new(7);

        tracker.drag_entered(stale.clone(), 1);
        tracker.drag_entered(fresh.clone(), 2);

        assert_eq!(stale.destroys(), 1);
        assert_eq!(fresh.destroys(), 0);
        assert_eq!(tracker.drag().unwrap().id(), 7);
    }
}
