//! DataSync Connection
//!
//! Browser transport for the DataSync driver, with exponential reconnect.
//! Components reach it through context and read realtime queries as signals.

use leptos::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use thinpost::datasync::{Driver, ServerMessage, StateReceiver, SubscriptionHandle};
use thinpost::models::{Insert, Record};
use thinpost::query::{Query, QueryState};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Shared DataSync connection, provided as context
#[derive(Clone)]
pub struct DataSync {
    inner: Rc<Inner>,
}

struct Inner {
    url: String,
    driver: RefCell<Driver>,
    ws: RefCell<Option<WebSocket>>,
    reconnect_attempts: Cell<u32>,
}

impl DataSync {
    /// Open the websocket at `url`
    pub fn connect(url: &str) -> Self {
        let datasync = Self {
            inner: Rc::new(Inner {
                url: url.to_string(),
                driver: RefCell::new(Driver::new()),
                ws: RefCell::new(None),
                reconnect_attempts: Cell::new(0),
            }),
        };
        datasync.open();
        datasync
    }

    fn open(&self) {
        match WebSocket::new(&self.inner.url) {
            Ok(ws) => {
                self.setup_handlers(&ws);
                *self.inner.ws.borrow_mut() = Some(ws);
            }
            Err(e) => {
                web_sys::console::error_1(&format!("WebSocket connection failed: {:?}", e).into());
                self.schedule_reconnect();
            }
        }
    }

    fn setup_handlers(&self, ws: &WebSocket) {
        // On open
        let this = self.clone();
        let on_open = Closure::wrap(Box::new(move |_: JsValue| {
            web_sys::console::log_1(&"DataSync connected".into());
            this.inner.reconnect_attempts.set(0);
            this.inner.driver.borrow_mut().on_connected();
            this.flush();
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        on_open.forget();

        // On message
        let this = self.clone();
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            if let Ok(text) = event.data().dyn_into::<js_sys::JsString>() {
                let text: String = text.into();
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        this.inner.driver.borrow_mut().handle_message(message);
                        this.flush();
                    }
                    Err(e) => web_sys::console::error_1(
                        &format!("Failed to parse DataSync message: {}", e).into(),
                    ),
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        on_message.forget();

        // On close
        let this = self.clone();
        let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
            web_sys::console::log_1(
                &format!("DataSync closed: code={}, reason={}", event.code(), event.reason()).into(),
            );
            this.inner.driver.borrow_mut().on_disconnect();
            this.schedule_reconnect();
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();

        // On error
        let on_error = Closure::wrap(Box::new(move |e: JsValue| {
            web_sys::console::error_1(&format!("WebSocket error: {:?}", e).into());
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_error.forget();
    }

    fn schedule_reconnect(&self) {
        let attempts = self.inner.reconnect_attempts.get();
        let Some(delay) = reconnect_delay(attempts) else {
            web_sys::console::error_1(&"Max reconnect attempts reached".into());
            self.inner.driver.borrow_mut().shutdown();
            return;
        };
        self.inner.reconnect_attempts.set(attempts + 1);

        let this = self.clone();
        gloo_timers::callback::Timeout::new(delay, move || {
            web_sys::console::log_1(
                &format!("Attempting reconnect (attempt {})", this.inner.reconnect_attempts.get()).into(),
            );
            this.open();
        })
        .forget();
    }

    /// Write whatever the driver has queued
    fn flush(&self) {
        let outgoing = self.inner.driver.borrow_mut().drain_outgoing();
        if outgoing.is_empty() {
            return;
        }
        let ws = self.inner.ws.borrow();
        let Some(ws) = ws.as_ref() else {
            return;
        };
        for message in outgoing {
            let sent = serde_json::to_string(&message)
                .map_err(|e| e.to_string())
                .and_then(|json| ws.send_with_str(&json).map_err(|e| format!("{:?}", e)));
            if let Err(e) = sent {
                web_sys::console::error_1(&format!("DataSync send failed: {}", e).into());
            }
        }
    }

    /// Start a realtime query
    pub fn subscribe(&self, query: Query) -> (SubscriptionHandle, StateReceiver) {
        let subscription = self.inner.driver.borrow_mut().subscribe(query);
        self.flush();
        subscription
    }

    /// Stop a realtime query
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.inner.driver.borrow_mut().unsubscribe(handle);
        self.flush();
    }

    /// Create a record; failures are logged
    pub fn insert<I: Insert + 'static>(&self, payload: &I) {
        let table = I::TABLE;
        let record = match payload.into_record() {
            Ok(record) => record,
            Err(e) => {
                web_sys::console::error_1(&format!("Invalid {} record: {}", table, e).into());
                return;
            }
        };
        let reply = self.inner.driver.borrow_mut().create_record(table, record);
        self.flush();

        spawn_local(async move {
            match reply.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => web_sys::console::error_1(
                    &format!("Failed to create {} record: {}", table, e).into(),
                ),
                Err(_) => web_sys::console::error_1(&"DataSync connection dropped".into()),
            }
        });
    }

    /// Drop the connection for good
    pub fn close(&self) {
        if let Some(ws) = self.inner.ws.borrow_mut().take() {
            ws.set_onclose(None);
            let _ = ws.close();
        }
        self.inner.driver.borrow_mut().shutdown();
    }
}

/// Backoff before reconnect attempt `attempts + 1`; `None` once exhausted
fn reconnect_delay(attempts: u32) -> Option<u32> {
    if attempts >= MAX_RECONNECT_ATTEMPTS {
        return None;
    }
    Some((2_u32.pow(attempts) * 1000).min(30000))
}

/// Provide the connection to the component tree
pub fn provide_datasync(url: &str) -> DataSync {
    let datasync = DataSync::connect(url);
    provide_context(datasync.clone());
    datasync
}

/// Subscribe to a realtime query for the lifetime of the calling component
///
/// The signal starts at `Loading`; the subscription ends on cleanup.
pub fn use_query(query: Query) -> ReadSignal<QueryState<Vec<Record>>> {
    let datasync = use_context::<DataSync>().expect("DataSync not found");
    let (handle, mut receiver) = datasync.subscribe(query);

    let (state, set_state) = create_signal(receiver.borrow_and_update().clone());
    spawn_local(async move {
        while receiver.changed().await.is_ok() {
            let next = receiver.borrow_and_update().clone();
            if set_state.try_set(next).is_some() {
                break;
            }
        }
    });

    on_cleanup(move || datasync.unsubscribe(handle));
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay() {
        assert_eq!(reconnect_delay(0), Some(1000));
        assert_eq!(reconnect_delay(4), Some(16000));
        assert_eq!(reconnect_delay(5), None);
    }
}
