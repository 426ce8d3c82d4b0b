//! Chat Page

use leptos::prelude::*;

use crate::api::{self, ChatBody, StreamEvent};
use crate::components::{DisplayMessage, LiveThoughts, LiveTurn, MessageBubble, TurnEnd};
use crate::stream::ChatSocket;

const MISSING_KEY_NOTICE: &str = "⚠️ Please enter your Groq API Key in the sidebar";
const CONNECTION_LOST: &str = "Connection to the server was lost";

#[component]
pub fn ChatPage() -> impl IntoView {
    let (session_id, set_session_id) = signal(None::<String>);
    let (messages, set_messages) = signal(Vec::<DisplayMessage>::new());
    let (input, set_input) = signal(String::new());
    let (live, set_live) = signal(None::<LiveTurn>);
    let (api_key, set_api_key) = signal(String::new());
    let (notice, set_notice) = signal(None::<String>);
    let socket = StoredValue::new_local(None::<ChatSocket>);

    let loading = move || live.with(Option::is_some);

    // Seeded transcript for a fresh chat
    leptos::task::spawn_local(async move {
        match api::create_session().await {
            Ok(view) => {
                set_messages.set(DisplayMessage::from_transcript(view.transcript, Vec::new()));
                set_session_id.set(Some(view.session_id));
            }
            Err(e) => set_notice.set(Some(e.error)),
        }
    });

    // The server leaves the transcript untouched on a rejected turn, so the
    // locally shown question goes back into the input box
    let abandon_turn = move |text: String| {
        set_live.set(None);
        let mut question = None;
        set_messages.update(|msgs| {
            if msgs.last().is_some_and(|m| m.role == "user") {
                question = msgs.pop();
            }
        });
        if let Some(question) = question {
            set_input.set(question.content);
        }
        set_notice.set(Some(text));
    };

    let on_event = move |event: StreamEvent| {
        let end = set_live
            .try_update(|turn| turn.as_mut().and_then(|t| t.apply(event)))
            .flatten();

        match end {
            Some(TurnEnd::Done {
                session_id,
                transcript,
            }) => {
                let steps = live.get_untracked().map(|t| t.steps).unwrap_or_default();
                set_messages.set(DisplayMessage::from_transcript(transcript, steps));
                set_session_id.set(Some(session_id));
                set_live.set(None);
            }
            Some(TurnEnd::Failed(e)) if e.is_missing_key() => abandon_turn(MISSING_KEY_NOTICE.into()),
            Some(TurnEnd::Failed(e)) => abandon_turn(e.error),
            None => {}
        }
    };

    let on_close = move || {
        if live.with_untracked(Option::is_some) {
            abandon_turn(CONNECTION_LOST.into());
        }
    };

    let send = move |()| {
        let msg = input.get();
        if msg.trim().is_empty() || loading() {
            return;
        }
        let Some(id) = session_id.get() else {
            return;
        };

        let stale = socket.with_value(|s| s.as_ref().is_none_or(|s| !s.is_usable()));
        if stale {
            match ChatSocket::connect(on_event, on_close) {
                Ok(s) => socket.set_value(Some(s)),
                Err(e) => {
                    set_notice.set(Some(e));
                    return;
                }
            }
        }

        let body = ChatBody::new(id, msg.clone(), &api_key.get());
        let sent = socket.with_value(|s| s.as_ref().map(|s| s.send(&body)));
        if let Some(Err(e)) = sent {
            set_notice.set(Some(e));
            return;
        }

        set_notice.set(None);
        set_input.set(String::new());
        set_messages.update(|msgs| {
            msgs.push(DisplayMessage {
                id: msgs.len(),
                role: "user".into(),
                content: msg,
                steps: Vec::new(),
            });
        });
        set_live.set(Some(LiveTurn::default()));
    };

    view! {
        <div class="chat">
            <aside class="sidebar">
                <h2>"Settings"</h2>
                <div class="field">
                    <label>"Enter your Groq API Key:"</label>
                    <input
                        type="password"
                        placeholder="gsk_..."
                        prop:value=move || api_key.get()
                        on:input=move |ev| set_api_key.set(event_target_value(&ev))
                    />
                </div>
            </aside>

            <section class="chat-main">
                <h1>"🔎 Chat with Search"</h1>
                <p class="subtitle">
                    "A ReAct agent that can search the web, arXiv and Wikipedia."
                </p>

                <div class="messages">
                    <For
                        each=move || messages.get()
                        key=|msg| msg.id
                        children=move |msg| view! { <MessageBubble message=msg /> }
                    />
                    {move || live.get().map(|turn| view! { <LiveThoughts turn=turn /> })}
                </div>

                {move || notice.get().map(|text| view! { <div class="notice">{text}</div> })}

                <div class="input-area">
                    <textarea
                        placeholder="What is machine learning?"
                        prop:value=move || input.get()
                        on:input=move |ev| set_input.set(event_target_value(&ev))
                        on:keydown=move |ev| {
                            if ev.key() == "Enter" && !ev.shift_key() {
                                ev.prevent_default();
                                send(());
                            }
                        }
                    />
                    <button on:click=move |_| send(()) disabled=loading>
                        {move || if loading() { "..." } else { "Send" }}
                    </button>
                </div>
            </section>
        </div>
    }
}
