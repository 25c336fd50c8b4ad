//! Stream dispatcher: routes each rows event to its table binding.
//!
//! Events are processed one at a time, to completion, in the order the
//! replication client delivers them. A row that fails to decode is skipped
//! on its own. A panic anywhere in decoding or in a handler abandons the
//! rest of that event only. The next event is dispatched normally.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use serde::Serialize;
use tracing::trace;

use crate::binding::TableBinding;
use crate::classifier;
use crate::client::EventSink;
use crate::diagnostics::{Diagnostics, EventFault};
use crate::error::DecodeError;
use crate::event::RowsEvent;
use crate::position::BinlogPosition;
use crate::registry::TableRegistry;

/// Counters over the lifetime of a dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub events: u64,
    pub unmatched: u64,
    pub rows_delivered: u64,
    pub rows_skipped: u64,
    pub faults: u64,
}

/// What happened to a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { rows: usize, skipped: usize },
    Unmatched,
    Faulted,
}

pub struct Dispatcher {
    registry: Arc<TableRegistry>,
    diagnostics: Arc<dyn Diagnostics>,
    stats: DispatchStats,
    position: Option<BinlogPosition>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TableRegistry>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            registry,
            diagnostics,
            stats: DispatchStats::default(),
            position: None,
        }
    }

    pub fn dispatch(&mut self, event: &RowsEvent) -> DispatchOutcome {
        self.stats.events += 1;

        let outcome = match self.registry.resolve(&event.schema, &event.table) {
            None => {
                self.stats.unmatched += 1;
                self.diagnostics.unmatched_table(&event.qualified_name());
                DispatchOutcome::Unmatched
            }
            Some(binding) => {
                let diagnostics = self.diagnostics.as_ref();
                let delivered = catch_event_panic(|| deliver_rows(binding, event, diagnostics));

                match delivered {
                    Ok((rows, skipped)) => {
                        self.stats.rows_delivered += rows as u64;
                        self.stats.rows_skipped += skipped as u64;
                        DispatchOutcome::Delivered { rows, skipped }
                    }
                    Err(caught) => {
                        self.stats.faults += 1;
                        let fault = EventFault {
                            table: binding.name().to_string(),
                            position: event.position.clone(),
                            message: panic_message(caught.payload.as_ref()),
                            location: caught.location,
                            backtrace: caught.backtrace,
                        };
                        self.diagnostics.event_faulted(&fault);
                        DispatchOutcome::Faulted
                    }
                }
            }
        };

        if let Some(position) = &event.position {
            self.position = Some(position.clone());
        }
        trace!(table = %event.qualified_name(), ?outcome, "Dispatched rows event");
        outcome
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Position of the last event processed, if the client reported one.
    pub fn position(&self) -> Option<&BinlogPosition> {
        self.position.as_ref()
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }
}

impl EventSink for Dispatcher {
    fn on_rows(&mut self, event: RowsEvent) {
        self.dispatch(&event);
    }

    fn on_rotate(&mut self, position: &BinlogPosition) {
        self.position = Some(position.clone());
    }
}

fn deliver_rows(
    binding: &TableBinding,
    event: &RowsEvent,
    diagnostics: &dyn Diagnostics,
) -> (usize, usize) {
    let mut delivered = 0;
    let mut skipped = 0;
    let mut rows = classifier::plan(event.action).indices(event.rows.len());

    while let Some(row) = rows.next() {
        match binding.deliver(event, row) {
            Ok(()) => delivered += 1,
            // No row of the event can decode; reported once for the event.
            Err(e @ DecodeError::MissingDescriptor { .. }) => {
                diagnostics.row_skipped(binding.name(), row, &e);
                skipped += 1 + rows.by_ref().count();
                break;
            }
            Err(e) => {
                skipped += 1;
                diagnostics.row_skipped(binding.name(), row, &e);
            }
        }
    }

    (delivered, skipped)
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static CAPTURED: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Where a panic was raised, recorded by the panic hook while unwinding has
/// not yet left the panicking frame.
struct PanicSite {
    location: Option<String>,
    backtrace: String,
}

struct CaughtPanic {
    payload: Box<dyn Any + Send>,
    location: Option<String>,
    backtrace: String,
}

/// Chain a hook in front of the current one. On threads inside
/// [`catch_event_panic`] it records the panic site and stays silent;
/// everywhere else it defers to the previous hook.
fn install_capture_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) {
                let site = PanicSite {
                    location: info.location().map(ToString::to_string),
                    backtrace: Backtrace::force_capture().to_string(),
                };
                CAPTURED.with(|captured| *captured.borrow_mut() = Some(site));
            } else {
                previous(info);
            }
        }));
    });
}

fn catch_event_panic<R>(f: impl FnOnce() -> R) -> Result<R, CaughtPanic> {
    install_capture_hook();
    CAPTURED.with(|captured| captured.borrow_mut().take());
    let outer = CAPTURING.with(|capturing| capturing.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|capturing| capturing.set(outer));

    result.map_err(|payload| {
        let site = CAPTURED.with(|captured| captured.borrow_mut().take());
        let (location, backtrace) = match site {
            Some(site) => (site.location, site.backtrace),
            None => (None, Backtrace::force_capture().to_string()),
        };
        CaughtPanic {
            payload,
            location,
            backtrace,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RowAction;
    use crate::testing::RecordingDiagnostics;
    use binlog_types::{Column, ColumnKind, RawValue};
    use std::sync::Mutex;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", ColumnKind::Number),
            Column::new("status", ColumnKind::String),
        ]
    }

    fn dispatcher_with(
        bindings: Vec<TableBinding>,
    ) -> (Dispatcher, Arc<RecordingDiagnostics>) {
        let mut registry = TableRegistry::new();
        for binding in bindings {
            registry.register(binding).unwrap();
        }
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        (
            Dispatcher::new(Arc::new(registry), diagnostics.clone()),
            diagnostics,
        )
    }

    #[test]
    fn test_unmatched_table_is_dropped() {
        let (mut dispatcher, diagnostics) = dispatcher_with(vec![]);
        let event = RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![vec![RawValue::I64(1), RawValue::from("pending")]],
        );
        assert_eq!(dispatcher.dispatch(&event), DispatchOutcome::Unmatched);
        assert_eq!(diagnostics.unmatched(), vec!["shop.orders".to_string()]);
        assert_eq!(dispatcher.stats().unmatched, 1);
    }

    #[test]
    fn test_short_row_skipped_rest_delivered() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let binding = TableBinding::new("shop.orders", move |_, new, _| {
            sink.lock().unwrap().push(new.unwrap()["id"].clone());
        });
        let (mut dispatcher, diagnostics) = dispatcher_with(vec![binding]);

        let event = RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![
                vec![RawValue::I64(1), RawValue::from("pending")],
                vec![RawValue::I64(2)],
                vec![RawValue::I64(3), RawValue::from("pending")],
            ],
        );

        assert_eq!(
            dispatcher.dispatch(&event),
            DispatchOutcome::Delivered {
                rows: 2,
                skipped: 1
            }
        );
        assert_eq!(*seen.lock().unwrap(), vec![RawValue::I64(1), RawValue::I64(3)]);
        assert_eq!(diagnostics.skipped_rows(), vec![("shop.orders".to_string(), 1)]);
    }

    #[test]
    fn test_missing_descriptor_reported_once_per_event() {
        #[derive(Default)]
        struct Order;

        let binding = TableBinding::with_descriptor(
            "shop.orders",
            None::<crate::descriptor::Descriptor<Order>>,
            |_, _, _| {},
        );
        let (mut dispatcher, diagnostics) = dispatcher_with(vec![binding]);
        let event = RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![
                vec![RawValue::I64(1), RawValue::from("pending")],
                vec![RawValue::I64(2), RawValue::from("pending")],
                vec![RawValue::I64(3), RawValue::from("pending")],
            ],
        );

        assert_eq!(
            dispatcher.dispatch(&event),
            DispatchOutcome::Delivered {
                rows: 0,
                skipped: 3
            }
        );
        assert_eq!(
            diagnostics.skip_errors(),
            vec![DecodeError::MissingDescriptor {
                table: "shop.orders".to_string()
            }]
        );
        assert_eq!(dispatcher.stats().rows_skipped, 3);
    }

    #[inline(never)]
    fn reject_order(id: &RawValue) {
        panic!("order {id:?} rejected");
    }

    #[test]
    fn test_fault_backtrace_points_at_panic_site() {
        let binding = TableBinding::new("shop.orders", |_, new, _| {
            reject_order(&new.unwrap()["id"]);
        });
        let (mut dispatcher, diagnostics) = dispatcher_with(vec![binding]);
        let event = RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![vec![RawValue::I64(9), RawValue::from("pending")]],
        );

        assert_eq!(dispatcher.dispatch(&event), DispatchOutcome::Faulted);

        let faults = diagnostics.faults();
        assert_eq!(faults[0].message, "order I64(9) rejected");
        assert!(faults[0].backtrace.contains("reject_order"));
    }

    #[test]
    fn test_panics_outside_dispatch_reach_previous_hook() {
        let (mut dispatcher, _) = dispatcher_with(vec![]);
        let event = RowsEvent::new("shop", "orders", RowAction::Insert, columns(), vec![]);
        dispatcher.dispatch(&event);

        assert!(!CAPTURING.with(Cell::get));
        let outside = panic::catch_unwind(|| panic!("outside dispatch"));
        assert!(outside.is_err());
        assert!(CAPTURED.with(|captured| captured.borrow().is_none()));
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let binding = TableBinding::new("shop.orders", |_, new, _| {
            if new.unwrap()["status"] == RawValue::from("boom") {
                panic!("handler exploded");
            }
        });
        let (mut dispatcher, diagnostics) = dispatcher_with(vec![binding]);

        let bad = RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![vec![RawValue::I64(1), RawValue::from("boom")]],
        )
        .with_position(BinlogPosition::new("mysql-bin.000001", 400));
        let good = RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![vec![RawValue::I64(2), RawValue::from("ok")]],
        )
        .with_position(BinlogPosition::new("mysql-bin.000001", 520));

        assert_eq!(dispatcher.dispatch(&bad), DispatchOutcome::Faulted);
        assert_eq!(
            dispatcher.dispatch(&good),
            DispatchOutcome::Delivered {
                rows: 1,
                skipped: 0
            }
        );

        let faults = diagnostics.faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].table, "shop.orders");
        assert_eq!(faults[0].message, "handler exploded");
        assert_eq!(
            faults[0].position,
            Some(BinlogPosition::new("mysql-bin.000001", 400))
        );
        assert!(faults[0]
            .location
            .as_deref()
            .is_some_and(|location| location.contains("dispatcher.rs")));
        assert_eq!(
            dispatcher.position(),
            Some(&BinlogPosition::new("mysql-bin.000001", 520))
        );
        assert_eq!(dispatcher.stats().faults, 1);
        assert_eq!(dispatcher.stats().events, 2);
    }
}
