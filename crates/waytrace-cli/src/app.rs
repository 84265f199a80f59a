//! Wayland transport adapter
//!
//! Owns the connection and every bound protocol object, decodes wire events
//! into waytrace-core's typed enums and drives the [`Tracer`]. Everything
//! runs on one thread inside `blocking_dispatch`; each handler finishes its
//! mutations before the next event is delivered.

use std::io;
use std::os::fd::OwnedFd;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use memmap2::MmapOptions;
use tracing::warn;
use wayland_client::protocol::{
    wl_buffer::{self, WlBuffer},
    wl_compositor::WlCompositor,
    wl_data_device::{self, WlDataDevice},
    wl_data_device_manager::{self, WlDataDeviceManager},
    wl_data_offer::{self, WlDataOffer},
    wl_keyboard::{self, WlKeyboard},
    wl_pointer::{self, WlPointer},
    wl_registry::{self, WlRegistry},
    wl_seat::{self, WlSeat},
    wl_shm::WlShm,
    wl_shm_pool::WlShmPool,
    wl_surface::WlSurface,
    wl_touch::{self, WlTouch},
};
use wayland_client::{
    delegate_noop, event_created_child, Connection, Dispatch, Proxy, QueueHandle, WEnum,
};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};
use waytrace_core::{
    DataDeviceEvent, DataOfferEvent, FilterSet, KeyboardEvent, KeymapFormat, OfferHandle,
    PointerEvent, ProxyIdentity, RegistryEvent, SeatEvent, SurfaceEvent, ToplevelEvent,
    TouchEvent, Tracer,
};

use crate::buffer;
use crate::Args;

/// Local wrapper around the foreign proxy type so the foreign
/// `OfferHandle` trait can be implemented for it (orphan rule).
pub(crate) struct OfferProxy(WlDataOffer);

impl OfferHandle for OfferProxy {
    fn id(&self) -> u32 {
        Proxy::id(&self.0).protocol_id()
    }

    fn accept(&self, serial: u32, mime_type: Option<&str>) {
        WlDataOffer::accept(&self.0, serial, mime_type.map(str::to_owned));
    }

    fn set_actions(&self, actions: u32, preferred: u32) {
        WlDataOffer::set_actions(
            &self.0,
            wl_data_device_manager::DndAction::from_bits_truncate(actions),
            wl_data_device_manager::DndAction::from_bits_truncate(preferred),
        );
    }

    fn destroy(&self) {
        WlDataOffer::destroy(&self.0);
    }
}

pub(crate) struct App {
    tracer: Tracer<OfferProxy, io::Stdout>,
    dump_map: Option<PathBuf>,

    compositor: Option<WlCompositor>,
    seat: Option<WlSeat>,
    shm: Option<WlShm>,
    wm_base: Option<XdgWmBase>,
    data_device_manager: Option<WlDataDeviceManager>,

    surface: Option<WlSurface>,
    width: i32,
    height: i32,

    pointer: Option<WlPointer>,
    keyboard: Option<WlKeyboard>,
    touch: Option<WlTouch>,
}

pub(crate) fn run(args: Args) -> Result<()> {
    let conn = Connection::connect_to_env().context("failed to connect to Wayland display")?;
    let display = conn.display();
    let mut queue = conn.new_event_queue();
    let qh = queue.handle();
    let _registry = display.get_registry(&qh, ());

    let mut app = App {
        tracer: Tracer::new(
            FilterSet::new(args.filter, args.inverse_filter),
            args.globals,
            io::stdout(),
        ),
        dump_map: args.dump_map,
        compositor: None,
        seat: None,
        shm: None,
        wm_base: None,
        data_device_manager: None,
        surface: None,
        width: 640,
        height: 480,
        pointer: None,
        keyboard: None,
        touch: None,
    };

    queue.roundtrip(&mut app).context("initial roundtrip failed")?;

    let compositor = require(&app.compositor, "wl_compositor")?;
    let seat = require(&app.seat, "wl_seat")?;
    require(&app.shm, "wl_shm")?;
    let wm_base = require(&app.wm_base, "xdg_wm_base")?;
    let data_device_manager = require(&app.data_device_manager, "wl_data_device_manager")?;

    let surface = compositor.create_surface(&qh, ());
    let xdg_surface = wm_base.get_xdg_surface(&surface, &qh, ());
    let toplevel = xdg_surface.get_toplevel(&qh, ());
    toplevel.set_title("waytrace".to_owned());
    toplevel.set_app_id("waytrace".to_owned());
    app.surface = Some(surface.clone());

    data_device_manager.get_data_device(&seat, &qh, ());

    surface.commit();
    queue.roundtrip(&mut app).context("startup roundtrip failed")?;

    while !app.tracer.is_done() {
        queue.blocking_dispatch(&mut app).context("connection to compositor lost")?;
    }
    Ok(())
}

fn require<T: Clone>(global: &Option<T>, name: &'static str) -> Result<T> {
    global.clone().with_context(|| format!("{name} is required but is not present"))
}

fn identity<P: Proxy>(proxy: &P) -> ProxyIdentity {
    ProxyIdentity::new(proxy.id().protocol_id(), P::interface().name)
}

fn surface_id(surface: &WlSurface) -> u32 {
    surface.id().protocol_id()
}

/// Write failures on stdout are reported to the diagnostic stream; the
/// trace itself keeps running.
fn log_write(result: io::Result<()>) {
    if let Err(err) = result {
        warn!("failed to write event line: {err}");
    }
}

/// Wayland arrays carry native-endian u32s.
fn parse_u32_array(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

impl App {
    /// Maps, optionally dumps and compiles a compositor keymap. The mapping
    /// and fd are released here regardless of the decoding outcome; the
    /// decoder never holds onto them.
    fn handle_keymap(&mut self, fd: OwnedFd, size: u32, format: u32) {
        let map = match unsafe { MmapOptions::new().len(size as usize).map(&fd) } {
            Ok(map) => map,
            Err(err) => {
                warn!("unable to mmap keymap: {err}");
                return;
            }
        };
        if let Some(path) = &self.dump_map {
            if let Err(err) = std::fs::write(path, &map[..]) {
                warn!(path = %path.display(), "unable to dump keymap: {err}");
            }
        }
        if let Err(err) = self.tracer.install_keymap(&map, KeymapFormat::from(format)) {
            warn!("keyboard decoding disabled: {err}");
        }
    }
}

impl Dispatch<WlRegistry, ()> for App {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global { name, interface, version } => {
                // Fixed bind versions; the tracer asks for what it knows.
                match interface.as_str() {
                    "wl_compositor" => {
                        state.compositor = Some(registry.bind(name, 4, qh, ()));
                    }
                    "wl_seat" => {
                        state.seat = Some(registry.bind(name, 6, qh, ()));
                    }
                    "wl_shm" => {
                        state.shm = Some(registry.bind(name, 1, qh, ()));
                    }
                    "xdg_wm_base" => {
                        state.wm_base = Some(registry.bind(name, 2, qh, ()));
                    }
                    "wl_data_device_manager" => {
                        state.data_device_manager = Some(registry.bind(name, 3, qh, ()));
                    }
                    _ => {}
                }
                log_write(state.tracer.registry_event(
                    identity(registry),
                    &RegistryEvent::Global { name, interface, version },
                ));
            }
            wl_registry::Event::GlobalRemove { name } => {
                log_write(
                    state
                        .tracer
                        .registry_event(identity(registry), &RegistryEvent::GlobalRemove { name }),
                );
            }
            _ => {}
        }
    }
}

impl Dispatch<WlSeat, ()> for App {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_seat::Event::Capabilities { capabilities } => {
                let caps = match capabilities {
                    WEnum::Value(v) => v.bits(),
                    WEnum::Unknown(v) => v,
                };
                log_write(state.tracer.seat_event(
                    identity(seat),
                    &SeatEvent::Capabilities { capabilities: caps },
                ));
                if caps & waytrace_core::SEAT_POINTER != 0 && state.pointer.is_none() {
                    state.pointer = Some(seat.get_pointer(qh, ()));
                }
                if caps & waytrace_core::SEAT_KEYBOARD != 0 && state.keyboard.is_none() {
                    state.keyboard = Some(seat.get_keyboard(qh, ()));
                }
                if caps & waytrace_core::SEAT_TOUCH != 0 && state.touch.is_none() {
                    state.touch = Some(seat.get_touch(qh, ()));
                }
            }
            wl_seat::Event::Name { name } => {
                log_write(state.tracer.seat_event(identity(seat), &SeatEvent::Name { name }));
            }
            _ => {}
        }
    }
}

impl Dispatch<WlPointer, ()> for App {
    fn event(
        state: &mut Self,
        pointer: &WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let decoded = match event {
            wl_pointer::Event::Enter { serial, surface, surface_x, surface_y } => {
                PointerEvent::Enter {
                    serial,
                    surface: surface_id(&surface),
                    x: surface_x,
                    y: surface_y,
                }
            }
            wl_pointer::Event::Leave { serial, surface } => {
                PointerEvent::Leave { serial, surface: surface_id(&surface) }
            }
            wl_pointer::Event::Motion { time, surface_x, surface_y } => {
                PointerEvent::Motion { time, x: surface_x, y: surface_y }
            }
            wl_pointer::Event::Button { serial, time, button, state: button_state } => {
                PointerEvent::Button {
                    serial,
                    time,
                    button,
                    state: wenum_plain(button_state),
                }
            }
            wl_pointer::Event::Axis { time, axis, value } => {
                PointerEvent::Axis { time, axis: wenum_plain(axis), value }
            }
            wl_pointer::Event::Frame => PointerEvent::Frame,
            wl_pointer::Event::AxisSource { axis_source } => {
                PointerEvent::AxisSource { source: wenum_plain(axis_source) }
            }
            wl_pointer::Event::AxisStop { time, axis } => {
                PointerEvent::AxisStop { time, axis: wenum_plain(axis) }
            }
            wl_pointer::Event::AxisDiscrete { axis, discrete } => {
                PointerEvent::AxisDiscrete { axis: wenum_plain(axis), discrete }
            }
            // Only sent by seats newer than the version we bind.
            _ => return,
        };
        log_write(state.tracer.pointer_event(identity(pointer), &decoded));
    }
}

/// Raw numeric value of a plain (non-bitfield) protocol enum.
fn wenum_plain<T: Into<u32>>(value: WEnum<T>) -> u32 {
    match value {
        WEnum::Value(v) => v.into(),
        WEnum::Unknown(v) => v,
    }
}

impl Dispatch<WlKeyboard, ()> for App {
    fn event(
        state: &mut Self,
        keyboard: &WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                let raw_format = wenum_plain(format);
                log_write(state.tracer.keyboard_event(
                    identity(keyboard),
                    &KeyboardEvent::Keymap { format: raw_format, size },
                ));
                state.handle_keymap(fd, size, raw_format);
            }
            wl_keyboard::Event::Enter { serial, surface, keys } => {
                log_write(state.tracer.keyboard_event(
                    identity(keyboard),
                    &KeyboardEvent::Enter {
                        serial,
                        surface: surface_id(&surface),
                        keys: parse_u32_array(&keys),
                    },
                ));
            }
            wl_keyboard::Event::Leave { serial, surface } => {
                log_write(state.tracer.keyboard_event(
                    identity(keyboard),
                    &KeyboardEvent::Leave { serial, surface: surface_id(&surface) },
                ));
            }
            wl_keyboard::Event::Key { serial, time, key, state: key_state } => {
                log_write(state.tracer.keyboard_event(
                    identity(keyboard),
                    &KeyboardEvent::Key { serial, time, key, state: wenum_plain(key_state) },
                ));
            }
            wl_keyboard::Event::Modifiers {
                serial,
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
            } => {
                log_write(state.tracer.keyboard_event(
                    identity(keyboard),
                    &KeyboardEvent::Modifiers {
                        serial,
                        depressed: mods_depressed,
                        latched: mods_latched,
                        locked: mods_locked,
                        group,
                    },
                ));
            }
            wl_keyboard::Event::RepeatInfo { rate, delay } => {
                log_write(state.tracer.keyboard_event(
                    identity(keyboard),
                    &KeyboardEvent::RepeatInfo { rate, delay },
                ));
            }
            _ => {}
        }
    }
}

impl Dispatch<WlTouch, ()> for App {
    fn event(
        state: &mut Self,
        touch: &WlTouch,
        event: wl_touch::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let decoded = match event {
            wl_touch::Event::Down { serial, time, surface, id, x, y } => {
                TouchEvent::Down { serial, time, surface: surface_id(&surface), id, x, y }
            }
            wl_touch::Event::Up { serial, time, id } => TouchEvent::Up { serial, time, id },
            wl_touch::Event::Motion { time, id, x, y } => TouchEvent::Motion { time, id, x, y },
            wl_touch::Event::Frame => TouchEvent::Frame,
            wl_touch::Event::Cancel => TouchEvent::Cancel,
            wl_touch::Event::Shape { id, major, minor } => TouchEvent::Shape { id, major, minor },
            wl_touch::Event::Orientation { id, orientation } => {
                TouchEvent::Orientation { id, orientation }
            }
            _ => return,
        };
        log_write(state.tracer.touch_event(identity(touch), &decoded));
    }
}

impl Dispatch<XdgWmBase, ()> for App {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for App {
    fn event(
        state: &mut Self,
        xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let xdg_surface::Event::Configure { serial } = event else {
            return;
        };
        log_write(
            state
                .tracer
                .surface_event(identity(xdg_surface), &SurfaceEvent::Configure { serial }),
        );
        xdg_surface.ack_configure(serial);
        if let (Some(surface), Some(shm)) = (&state.surface, &state.shm) {
            match buffer::draw_checkerboard(shm, qh, state.width, state.height) {
                Ok(buf) => {
                    surface.attach(Some(&buf), 0, 0);
                    surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
                    surface.commit();
                }
                Err(err) => warn!("failed to draw window buffer: {err}"),
            }
        }
    }
}

impl Dispatch<XdgToplevel, ()> for App {
    fn event(
        state: &mut Self,
        toplevel: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, states } => {
                (state.width, state.height) = configure_size(width, height);
                log_write(state.tracer.toplevel_event(
                    identity(toplevel),
                    &ToplevelEvent::Configure {
                        width,
                        height,
                        states: parse_u32_array(&states),
                    },
                ));
            }
            xdg_toplevel::Event::Close => {
                log_write(state.tracer.toplevel_event(identity(toplevel), &ToplevelEvent::Close));
            }
            _ => {}
        }
    }
}

impl Dispatch<WlBuffer, ()> for App {
    fn event(
        _: &mut Self,
        buffer: &WlBuffer,
        event: wl_buffer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        // Buffers are single-use; the server is done with this one.
        if let wl_buffer::Event::Release = event {
            buffer.destroy();
        }
    }
}

impl Dispatch<WlDataDevice, ()> for App {
    fn event(
        state: &mut Self,
        device: &WlDataDevice,
        event: wl_data_device::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let decoded = match event {
            wl_data_device::Event::DataOffer { id } => {
                DataDeviceEvent::DataOffer { offer: OfferProxy(id) }
            }
            wl_data_device::Event::Enter { serial, surface, x, y, id } => DataDeviceEvent::Enter {
                serial,
                surface: surface_id(&surface),
                x,
                y,
                offer: id.map(OfferProxy),
            },
            wl_data_device::Event::Leave => DataDeviceEvent::Leave,
            wl_data_device::Event::Motion { time, x, y } => {
                DataDeviceEvent::Motion { time, x, y }
            }
            wl_data_device::Event::Drop => DataDeviceEvent::Drop,
            wl_data_device::Event::Selection { id } => {
                DataDeviceEvent::Selection { offer: id.map(OfferProxy) }
            }
            _ => return,
        };
        log_write(state.tracer.data_device_event(identity(device), decoded));
    }

    event_created_child!(App, WlDataDevice, [
        wl_data_device::EVT_DATA_OFFER_OPCODE => (WlDataOffer, ()),
    ]);
}

impl Dispatch<WlDataOffer, ()> for App {
    fn event(
        state: &mut Self,
        offer: &WlDataOffer,
        event: wl_data_offer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let decoded = match event {
            wl_data_offer::Event::Offer { mime_type } => DataOfferEvent::Offer { mime_type },
            wl_data_offer::Event::SourceActions { source_actions } => {
                DataOfferEvent::SourceActions { actions: wenum_bits(source_actions) }
            }
            wl_data_offer::Event::Action { dnd_action } => {
                DataOfferEvent::Action { action: wenum_bits(dnd_action) }
            }
            _ => return,
        };
        log_write(state.tracer.data_offer_event(identity(offer), &decoded));
    }
}

/// Raw numeric value of a bitfield protocol enum.
fn wenum_bits(value: WEnum<wl_data_device_manager::DndAction>) -> u32 {
    match value {
        WEnum::Value(v) => v.bits(),
        WEnum::Unknown(v) => v,
    }
}

/// Buffer size for a toplevel configure. A zero dimension means the
/// client picks; the whole size falls back to the default together.
fn configure_size(width: i32, height: i32) -> (i32, i32) {
    if width == 0 || height == 0 {
        (640, 480)
    } else {
        (width, height)
    }
}

delegate_noop!(App: WlCompositor);
delegate_noop!(App: WlShmPool);
delegate_noop!(App: WlDataDeviceManager);
delegate_noop!(App: ignore WlShm);
delegate_noop!(App: ignore WlSurface);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_size_passes_through_real_sizes() {
        assert_eq!(configure_size(800, 600), (800, 600));
    }

    #[test]
    fn test_configure_size_falls_back_when_either_dimension_is_zero() {
        assert_eq!(configure_size(0, 0), (640, 480));
        assert_eq!(configure_size(0, 500), (640, 480));
        assert_eq!(configure_size(500, 0), (640, 480));
    }
}
