//! Event formatting and dispatch
//!
//! [`TraceLog`] turns one event into one `[id:interface] name: fields`
//! line, consulting the filter set before doing any work. [`Tracer`] is the
//! root the transport adapter drives: one method per object class, each a
//! thin adapter from that class's event enum onto the log, the keymap
//! decoder and the offer tracker.

use std::fmt;
use std::io::{self, Write};

use crate::error::KeymapError;
use crate::event::*;
use crate::filter::FilterSet;
use crate::keymap::{KeymapDecoder, KeymapFormat};
use crate::names::*;
use crate::offer::{OfferHandle, OfferTracker};

/// Indent for continuation lines, matching the `[id:interface] ` header.
const SPACER: &str = "                      ";

/// Filtered line writer for the event stream.
pub struct TraceLog<W: Write> {
    filters: FilterSet,
    out: W,
}

impl<W: Write> TraceLog<W> {
    pub fn new(filters: FilterSet, out: W) -> Self {
        Self { filters, out }
    }

    /// Write one `[id:interface] event: body` line. Returns `false`
    /// without writing anything when the filters suppress the event;
    /// callers use that to skip expensive follow-up detail lines.
    pub fn emit(
        &mut self,
        proxy: ProxyIdentity,
        event: &str,
        body: fmt::Arguments,
    ) -> io::Result<bool> {
        if !self.filters.should_emit(proxy.interface, event) {
            return Ok(false);
        }
        writeln!(self.out, "[{:02}:{:>16}] {}: {}", proxy.id, proxy.interface, event, body)?;
        Ok(true)
    }

    /// Like [`emit`](Self::emit) for events without fields; the separator
    /// after the event name is omitted.
    pub fn emit_bare(&mut self, proxy: ProxyIdentity, event: &str) -> io::Result<bool> {
        if !self.filters.should_emit(proxy.interface, event) {
            return Ok(false);
        }
        writeln!(self.out, "[{:02}:{:>16}] {}", proxy.id, proxy.interface, event)?;
        Ok(true)
    }

    /// Continuation line indented under the preceding header.
    pub fn detail(&mut self, body: fmt::Arguments) -> io::Result<()> {
        writeln!(self.out, "{SPACER}{body}")
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Root of the core: owns the log, the keymap decoder and the offer
/// tracker, and consumes one typed event per call, in arrival order.
pub struct Tracer<H: OfferHandle, W: Write> {
    log: TraceLog<W>,
    keymap: KeymapDecoder,
    offers: OfferTracker<H>,
    print_globals: bool,
    done: bool,
}

impl<H: OfferHandle, W: Write> Tracer<H, W> {
    pub fn new(filters: FilterSet, print_globals: bool, out: W) -> Self {
        Self {
            log: TraceLog::new(filters, out),
            keymap: KeymapDecoder::new(),
            offers: OfferTracker::new(),
            print_globals,
            done: false,
        }
    }

    /// Set once the toplevel close event arrives; the dispatch loop exits.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed the raw keymap bytes from a `wl_keyboard.keymap` event to the
    /// decoder. The caller retains ownership of the backing mapping.
    pub fn install_keymap(&mut self, bytes: &[u8], format: KeymapFormat) -> Result<(), KeymapError> {
        self.keymap.install(bytes, format)
    }

    pub fn decoder(&self) -> &KeymapDecoder {
        &self.keymap
    }

    pub fn offers(&self) -> &OfferTracker<H> {
        &self.offers
    }

    pub fn into_inner(self) -> W {
        self.log.into_inner()
    }

    pub fn registry_event(&mut self, proxy: ProxyIdentity, event: &RegistryEvent) -> io::Result<()> {
        match event {
            RegistryEvent::Global { name, interface, version } if self.print_globals => {
                self.log.emit(
                    proxy,
                    "global",
                    format_args!("interface: '{interface}', version: {version}, name: {name}"),
                )?;
            }
            // Removals are uninteresting for a tracing client.
            _ => {}
        }
        Ok(())
    }

    pub fn seat_event(&mut self, proxy: ProxyIdentity, event: &SeatEvent) -> io::Result<()> {
        match event {
            SeatEvent::Capabilities { capabilities } => {
                let names = seat_capabilities_names(*capabilities);
                self.log.emit(proxy, "capabilities", format_args!("{names}"))?;
            }
            SeatEvent::Name { name } => {
                self.log.emit(proxy, "name", format_args!("{name}"))?;
            }
        }
        Ok(())
    }

    pub fn pointer_event(&mut self, proxy: ProxyIdentity, event: &PointerEvent) -> io::Result<()> {
        match event {
            PointerEvent::Enter { serial, surface, x, y } => {
                self.log.emit(
                    proxy,
                    "enter",
                    format_args!("serial: {serial}; surface: {surface}, x, y: {x:.6}, {y:.6}"),
                )?;
            }
            PointerEvent::Leave { serial: _, surface } => {
                self.log.emit(proxy, "leave", format_args!("surface: {surface}"))?;
            }
            PointerEvent::Motion { time, x, y } => {
                self.log.emit(
                    proxy,
                    "motion",
                    format_args!("time: {time}; x, y: {x:.6}, {y:.6}"),
                )?;
            }
            PointerEvent::Button { serial, time, button, state } => {
                self.log.emit(
                    proxy,
                    "button",
                    format_args!(
                        "serial: {serial}; time: {time}; button: {button} ({}), state: {state} ({})",
                        pointer_button_name(*button),
                        button_state_name(*state),
                    ),
                )?;
            }
            PointerEvent::Axis { time, axis, value } => {
                self.log.emit(
                    proxy,
                    "axis",
                    format_args!(
                        "time: {time}; axis: {axis} ({}), value: {value:.6}",
                        axis_name(*axis),
                    ),
                )?;
            }
            PointerEvent::Frame => {
                self.log.emit_bare(proxy, "frame")?;
            }
            PointerEvent::AxisSource { source } => {
                self.log.emit(
                    proxy,
                    "axis_source",
                    format_args!("{source} ({})", axis_source_name(*source)),
                )?;
            }
            PointerEvent::AxisStop { time, axis } => {
                self.log.emit(
                    proxy,
                    "axis_stop",
                    format_args!("time: {time}; axis: {axis} ({})", axis_name(*axis)),
                )?;
            }
            PointerEvent::AxisDiscrete { axis, discrete } => {
                self.log.emit(
                    proxy,
                    "axis_discrete",
                    format_args!("axis: {axis} ({}), discrete: {discrete}", axis_name(*axis)),
                )?;
            }
        }
        Ok(())
    }

    pub fn keyboard_event(&mut self, proxy: ProxyIdentity, event: &KeyboardEvent) -> io::Result<()> {
        match event {
            KeyboardEvent::Keymap { format, size } => {
                self.log.emit(
                    proxy,
                    "keymap",
                    format_args!(
                        "format: {format} ({}), size: {size}",
                        keymap_format_name(*format),
                    ),
                )?;
            }
            KeyboardEvent::Enter { serial, surface, keys } => {
                let emitted = self.log.emit(
                    proxy,
                    "enter",
                    format_args!("serial: {serial}; surface: {surface}"),
                )?;
                if emitted {
                    for key in keys {
                        self.key_detail(*key, true)?;
                    }
                }
            }
            KeyboardEvent::Leave { serial, surface } => {
                self.log.emit(
                    proxy,
                    "leave",
                    format_args!("serial: {serial}; surface: {surface}"),
                )?;
            }
            KeyboardEvent::Key { serial, time, key, state } => {
                let emitted = self.log.emit(
                    proxy,
                    "key",
                    format_args!(
                        "serial: {serial}; time: {time}; key: {key}; state: {state} ({})",
                        key_state_name(*state),
                    ),
                )?;
                if emitted {
                    self.key_detail(*key, *state == 1)?;
                }
            }
            KeyboardEvent::Modifiers { serial, depressed, latched, locked, group } => {
                let emitted = self.log.emit(
                    proxy,
                    "modifiers",
                    format_args!("serial: {serial}; group: {group}"),
                )?;
                if emitted {
                    self.modifier_detail("depressed", *depressed)?;
                    self.modifier_detail("latched", *latched)?;
                    self.modifier_detail("locked", *locked)?;
                }
                // Update after rendering so the masks are shown against the
                // keymap names they arrived under.
                self.keymap.apply_modifiers(*depressed, *latched, *locked, *group);
            }
            KeyboardEvent::RepeatInfo { rate, delay } => {
                self.log.emit(
                    proxy,
                    "repeat_info",
                    format_args!("rate: {rate} keys/sec; delay: {delay} ms"),
                )?;
            }
        }
        Ok(())
    }

    /// `sym`/`utf8` continuation line for one key. Skipped entirely while
    /// no keymap is installed; the event header was already printed.
    fn key_detail(&mut self, raw_code: u32, pressed: bool) -> io::Result<()> {
        let Some((name, sym)) = self.keymap.resolve_symbol(raw_code) else {
            return Ok(());
        };
        let text = self.keymap.resolve_text(pressed.then_some(raw_code));
        self.log.detail(format_args!("sym: {name:<12} ({sym}), utf8: '{text}'"))
    }

    /// One `label: mask` line. Any non-zero mask gets the `: ` separator
    /// even if none of its bits has a name in the current keymap; each
    /// resolved name is space-terminated.
    fn modifier_detail(&mut self, label: &str, mask: u32) -> io::Result<()> {
        let mut line = format!("{label}: {mask:08X}");
        if mask != 0 {
            line.push_str(": ");
            for bit in 0..32u32 {
                if mask >> bit & 1 == 1 {
                    if let Some(name) = self.keymap.modifier_name(bit) {
                        line.push_str(&name);
                        line.push(' ');
                    }
                }
            }
        }
        self.log.detail(format_args!("{line}"))
    }

    pub fn touch_event(&mut self, proxy: ProxyIdentity, event: &TouchEvent) -> io::Result<()> {
        match event {
            TouchEvent::Down { serial, time, surface, id, x, y } => {
                self.log.emit(
                    proxy,
                    "down",
                    format_args!(
                        "serial: {serial}; time: {time}; surface: {surface}; id: {id}; x, y: {x:.6}, {y:.6}",
                    ),
                )?;
            }
            TouchEvent::Up { serial, time, id } => {
                self.log.emit(
                    proxy,
                    "up",
                    format_args!("serial: {serial}; time: {time}; id: {id}"),
                )?;
            }
            TouchEvent::Motion { time, id, x, y } => {
                self.log.emit(
                    proxy,
                    "motion",
                    format_args!("time: {time}; id: {id}; x, y: {x:.6}, {y:.6}"),
                )?;
            }
            TouchEvent::Frame => {
                self.log.emit_bare(proxy, "frame")?;
            }
            TouchEvent::Cancel => {
                self.log.emit_bare(proxy, "cancel")?;
            }
            TouchEvent::Shape { id, major, minor } => {
                self.log.emit(
                    proxy,
                    "shape",
                    format_args!("id: {id}; major, minor: {major:.6}, {minor:.6}"),
                )?;
            }
            TouchEvent::Orientation { id, orientation } => {
                self.log.emit(
                    proxy,
                    "orientation",
                    format_args!("id: {id}; orientation: {orientation:.6}"),
                )?;
            }
        }
        Ok(())
    }

    pub fn toplevel_event(&mut self, proxy: ProxyIdentity, event: &ToplevelEvent) -> io::Result<()> {
        match event {
            ToplevelEvent::Configure { width, height, states } => {
                let emitted = self.log.emit(
                    proxy,
                    "configure",
                    format_args!("width: {width}; height: {height}"),
                )?;
                if emitted && !states.is_empty() {
                    let names: Vec<&str> =
                        states.iter().map(|s| toplevel_state_name(*s)).collect();
                    self.log.detail(format_args!("{}", names.join(" ")))?;
                }
            }
            ToplevelEvent::Close => {
                self.done = true;
                self.log.emit_bare(proxy, "close")?;
            }
        }
        Ok(())
    }

    pub fn surface_event(&mut self, proxy: ProxyIdentity, event: &SurfaceEvent) -> io::Result<()> {
        match event {
            SurfaceEvent::Configure { serial } => {
                self.log.emit(proxy, "configure", format_args!("serial: {serial}"))?;
            }
        }
        Ok(())
    }

    pub fn data_offer_event(&mut self, proxy: ProxyIdentity, event: &DataOfferEvent) -> io::Result<()> {
        match event {
            DataOfferEvent::Offer { mime_type } => {
                self.log.emit(proxy, "offer", format_args!("mime_type: {mime_type}"))?;
            }
            DataOfferEvent::SourceActions { actions } => {
                self.log.emit(
                    proxy,
                    "source_actions",
                    format_args!("actions: {actions} ({})", dnd_actions_name(*actions)),
                )?;
            }
            DataOfferEvent::Action { action } => {
                self.log.emit(
                    proxy,
                    "action",
                    format_args!("dnd_action: {action} ({})", dnd_actions_name(*action)),
                )?;
            }
        }
        Ok(())
    }

    /// Consumes the event because the offer handles inside move into the
    /// tracker's ownership slots.
    pub fn data_device_event(
        &mut self,
        proxy: ProxyIdentity,
        event: DataDeviceEvent<H>,
    ) -> io::Result<()> {
        match event {
            DataDeviceEvent::DataOffer { offer } => {
                // The adapter already registered for the offer's events;
                // ownership only moves to the tracker on enter/selection.
                self.log.emit(proxy, "data_offer", format_args!("id: {}", offer.id()))?;
            }
            DataDeviceEvent::Enter { serial, surface, x, y, offer } => {
                let id = offer.as_ref().map_or(0, |o| o.id());
                self.log.emit(
                    proxy,
                    "enter",
                    format_args!(
                        "serial: {serial}; surface: {surface}; x, y: {x:.6}, {y:.6}; id: {id}",
                    ),
                )?;
                if let Some(offer) = offer {
                    self.offers.drag_entered(offer, serial);
                }
            }
            DataDeviceEvent::Leave => {
                self.log.emit_bare(proxy, "leave")?;
                self.offers.drag_left();
            }
            DataDeviceEvent::Motion { time, x, y } => {
                self.log.emit(
                    proxy,
                    "motion",
                    format_args!("time: {time}; x, y: {x:.6}, {y:.6}"),
                )?;
            }
            DataDeviceEvent::Drop => {
                self.log.emit_bare(proxy, "drop")?;
                self.offers.drag_dropped();
            }
            DataDeviceEvent::Selection { offer } => {
                match &offer {
                    Some(offer) => {
                        self.log.emit(proxy, "selection", format_args!("id: {}", offer.id()))?;
                    }
                    None => {
                        self.log.emit(proxy, "selection", format_args!("(cleared)"))?;
                    }
                }
                self.offers.selection_changed(offer);
            }
        }
        Ok(())
    }
}
