//! Observing the DIO interrupt line.
//!
//! The platform's GPIO layer calls [`InterruptMonitor::on_rising_edge`] from its
//! edge callback or interrupt handler. The monitor only queues a timestamped
//! [`IrqEvent`]; it never touches the register bus, which belongs to the thread
//! running the transmit session. That thread calls [`InterruptMonitor::drain`]
//! whenever convenient to log and consume the events.
//!
//! The monitor is purely diagnostic. FIFO flow control is done by polling
//! (see [`crate::fifo`]), not by this line.
//!
//! ## Example
//!
//! ```rust
//! use sx127x_pager::irq::InterruptMonitor;
//!
//! static DIO0: InterruptMonitor<8> = InterruptMonitor::new(16);
//!
//! // In the GPIO edge callback:
//! DIO0.on_rising_edge(true, 1_000);
//!
//! // In the main loop:
//! let handled = DIO0.drain(|event| assert_eq!(event.line, 16));
//! assert_eq!(handled, 1);
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;

use critical_section::Mutex;
use embedded_hal::digital::InputPin;
use heapless::Deque;

use crate::consts::IRQ_QUEUE_LEN;
use crate::error::Error;

/// One observed edge.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct IrqEvent {
    /// GPIO line the edge was seen on.
    pub line: u8,
    /// Level of the line when the callback ran.
    pub level: bool,
    /// Platform timestamp of the edge, in the platform's units.
    pub timestamp: u64,
}

/// Interrupt-safe queue of edges seen on one input line.
///
/// `N` bounds the number of undrained events; further edges are counted in
/// [`dropped`](Self::dropped) and discarded.
pub struct InterruptMonitor<const N: usize = IRQ_QUEUE_LEN> {
    line: u8,
    events: Mutex<RefCell<Deque<IrqEvent, N>>>,
    dropped: Mutex<Cell<u32>>,
}

impl<const N: usize> InterruptMonitor<N> {
    /// Creates a monitor for `line`. Usable in a `static`.
    pub const fn new(line: u8) -> Self {
        Self {
            line,
            events: Mutex::new(RefCell::new(Deque::new())),
            dropped: Mutex::new(Cell::new(0)),
        }
    }

    /// The monitored GPIO line.
    pub fn line(&self) -> u8 {
        self.line
    }

    /// Records a rising edge. Safe to call from interrupt context.
    pub fn on_rising_edge(&self, level: bool, timestamp: u64) {
        let event = IrqEvent {
            line: self.line,
            level,
            timestamp,
        };
        critical_section::with(|cs| {
            if self.events.borrow(cs).borrow_mut().push_back(event).is_err() {
                let dropped = self.dropped.borrow(cs);
                dropped.set(dropped.get().saturating_add(1));
            }
        });
    }

    /// Samples `pin` and records an edge with its current level.
    ///
    /// For platforms whose callback does not report the level itself.
    pub fn sample<P: InputPin>(&self, pin: &mut P, timestamp: u64) -> Result<(), Error> {
        let level = pin.is_high().map_err(Error::pin)?;
        self.on_rising_edge(level, timestamp);
        Ok(())
    }

    /// Logs and hands every queued event to `f`, oldest first.
    ///
    /// # Returns
    /// The number of events handled.
    pub fn drain<F: FnMut(IrqEvent)>(&self, mut f: F) -> usize {
        let mut handled = 0;
        // Pop one at a time so `f` never runs inside the critical section
        while let Some(event) =
            critical_section::with(|cs| self.events.borrow(cs).borrow_mut().pop_front())
        {
            info!(
                "Interrupt detected: line {}, level {}, timestamp {}",
                event.line, event.level, event.timestamp
            );
            f(event);
            handled += 1;
        }

        let dropped = critical_section::with(|cs| self.dropped.borrow(cs).replace(0));
        if dropped > 0 {
            warn!("{} interrupt events dropped on line {}", dropped, self.line);
        }
        handled
    }

    /// Events waiting to be drained.
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.events.borrow(cs).borrow().len())
    }

    /// Events discarded because the queue was full, since the last drain.
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }
}

impl<const N: usize> fmt::Debug for InterruptMonitor<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptMonitor")
            .field("line", &self.line)
            .field("pending", &self.pending())
            .field("dropped", &self.dropped())
            .finish()
    }
}
