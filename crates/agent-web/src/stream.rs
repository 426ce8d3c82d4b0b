//! Chat Socket
//!
//! Browser WebSocket to `/api/chat/stream`, decoding each text frame into a
//! [`StreamEvent`].

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use crate::api::{ChatBody, StreamEvent};

fn js_error(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// `ws://` or `wss://` URL for a path on the serving host
fn socket_url(path: &str) -> Result<String, String> {
    let location = web_sys::window().ok_or("No browser window")?.location();
    let scheme = match location.protocol().map_err(|e| js_error(&e))?.as_str() {
        "https:" => "wss",
        _ => "ws",
    };
    let host = location.host().map_err(|e| js_error(&e))?;
    Ok(format!("{scheme}://{host}{path}"))
}

/// An open (or opening) chat socket.
///
/// Requests sent while the socket is still connecting are queued and
/// flushed once it opens.
pub struct ChatSocket {
    ws: WebSocket,
    queued: Rc<RefCell<Vec<String>>>,
    _on_open: Closure<dyn FnMut()>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl ChatSocket {
    pub fn connect(
        on_event: impl Fn(StreamEvent) + 'static,
        on_close: impl Fn() + 'static,
    ) -> Result<Self, String> {
        let ws = WebSocket::new(&socket_url("/api/chat/stream")?).map_err(|e| js_error(&e))?;
        let queued: Rc<RefCell<Vec<String>>> = Rc::default();

        let on_open = {
            let ws = ws.clone();
            let queued = Rc::clone(&queued);
            Closure::<dyn FnMut()>::new(move || {
                for text in queued.borrow_mut().drain(..) {
                    if let Err(e) = ws.send_with_str(&text) {
                        leptos::logging::error!("Chat socket send failed: {}", js_error(&e));
                    }
                }
            })
        };

        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
            let Some(text) = ev.data().as_string() else {
                return;
            };
            match serde_json::from_str::<StreamEvent>(&text) {
                Ok(event) => on_event(event),
                Err(e) => leptos::logging::warn!("Unreadable stream event: {e}"),
            }
        });

        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |_: CloseEvent| on_close());

        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            queued,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        })
    }

    /// Open, or still opening
    pub fn is_usable(&self) -> bool {
        matches!(self.ws.ready_state(), WebSocket::OPEN | WebSocket::CONNECTING)
    }

    pub fn send(&self, body: &ChatBody) -> Result<(), String> {
        let text = serde_json::to_string(body).map_err(|e| e.to_string())?;
        match self.ws.ready_state() {
            WebSocket::OPEN => self.ws.send_with_str(&text).map_err(|e| js_error(&e)),
            WebSocket::CONNECTING => {
                self.queued.borrow_mut().push(text);
                Ok(())
            }
            _ => Err("Connection closed".into()),
        }
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        let _ = self.ws.close();
    }
}
