//! Typed event model
//!
//! One closed enum per object class the tracer listens on. The transport
//! adapter decodes each wire event into the matching variant, so the core
//! sees the same one-event-at-a-time ordering the server produced without
//! ever touching the socket. Enumerated protocol values stay as raw `u32`s
//! here; rendering them with symbolic names is the formatter's job.

/// Identity of the object an event arrived on, as reported by the
/// transport. Never mutated by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyIdentity {
    pub id: u32,
    pub interface: &'static str,
}

impl ProxyIdentity {
    pub fn new(id: u32, interface: &'static str) -> Self {
        Self { id, interface }
    }
}

/// Seat capability bits, mirroring `wl_seat.capability`.
pub const SEAT_POINTER: u32 = 1;
pub const SEAT_KEYBOARD: u32 = 2;
pub const SEAT_TOUCH: u32 = 4;

#[derive(Debug, Clone)]
pub enum SeatEvent {
    Capabilities { capabilities: u32 },
    Name { name: String },
}

#[derive(Debug, Clone)]
pub enum PointerEvent {
    Enter { serial: u32, surface: u32, x: f64, y: f64 },
    Leave { serial: u32, surface: u32 },
    Motion { time: u32, x: f64, y: f64 },
    Button { serial: u32, time: u32, button: u32, state: u32 },
    Axis { time: u32, axis: u32, value: f64 },
    Frame,
    AxisSource { source: u32 },
    AxisStop { time: u32, axis: u32 },
    AxisDiscrete { axis: u32, discrete: i32 },
}

#[derive(Debug, Clone)]
pub enum KeyboardEvent {
    Keymap { format: u32, size: u32 },
    Enter { serial: u32, surface: u32, keys: Vec<u32> },
    Leave { serial: u32, surface: u32 },
    Key { serial: u32, time: u32, key: u32, state: u32 },
    Modifiers { serial: u32, depressed: u32, latched: u32, locked: u32, group: u32 },
    RepeatInfo { rate: i32, delay: i32 },
}

#[derive(Debug, Clone)]
pub enum TouchEvent {
    Down { serial: u32, time: u32, surface: u32, id: i32, x: f64, y: f64 },
    Up { serial: u32, time: u32, id: i32 },
    Motion { time: u32, id: i32, x: f64, y: f64 },
    Frame,
    Cancel,
    Shape { id: i32, major: f64, minor: f64 },
    Orientation { id: i32, orientation: f64 },
}

/// `xdg_toplevel` events.
#[derive(Debug, Clone)]
pub enum ToplevelEvent {
    Configure { width: i32, height: i32, states: Vec<u32> },
    Close,
}

/// `xdg_surface` events.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    Configure { serial: u32 },
}

#[derive(Debug, Clone)]
pub enum DataOfferEvent {
    Offer { mime_type: String },
    SourceActions { actions: u32 },
    Action { action: u32 },
}

/// Events on the data device. Variants that introduce an offer carry the
/// transport handle itself; the tracer hands it to the offer tracker, which
/// becomes its sole owner. A `None` offer on `Enter`/`Selection` is the
/// protocol's way of saying "nothing on offer".
#[derive(Debug, Clone)]
pub enum DataDeviceEvent<H> {
    DataOffer { offer: H },
    Enter { serial: u32, surface: u32, x: f64, y: f64, offer: Option<H> },
    Leave,
    Motion { time: u32, x: f64, y: f64 },
    Drop,
    Selection { offer: Option<H> },
}

#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Global { name: u32, interface: String, version: u32 },
    GlobalRemove { name: u32 },
}
