//! Server-rendered pages. Markup is deliberately small; the browser-side
//! scripts talk to the `/api` routes.

use axum::response::Html;

use crate::{auth::repo_types::User, transcripts::dto::TranscriptView};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} · TubeScribe</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    ))
}

fn notice(class: &str, text: Option<&str>) -> String {
    text.map(|t| format!("<p class=\"{class}\">{}</p>", escape(t)))
        .unwrap_or_default()
}

fn nav(user: &User) -> String {
    format!(
        "<nav><a href=\"/\">Home</a> <a href=\"/my-files\">My files</a> \
         <a href=\"/profile\">{}</a> <a href=\"/logout\">Log out</a></nav>",
        escape(&user.username)
    )
}

pub fn login(email: &str, error: Option<&str>, success: Option<&str>) -> Html<String> {
    let body = format!(
        "<h1>Log in</h1>{}{}\n\
         <form method=\"post\" action=\"/login\">\n\
         <input type=\"email\" name=\"email\" value=\"{}\" required>\n\
         <input type=\"password\" name=\"password\" required>\n\
         <label><input type=\"checkbox\" name=\"remember\"> Remember me</label>\n\
         <button type=\"submit\">Log in</button>\n</form>\n\
         <p><a href=\"/register\">Create an account</a> · \
         <a href=\"/forgot-password\">Forgot password?</a></p>",
        notice("error", error),
        notice("success", success),
        escape(email)
    );
    layout("Log in", &body)
}

pub fn register(username: &str, email: &str, error: Option<&str>) -> Html<String> {
    let body = format!(
        "<h1>Create account</h1>{}\n\
         <form method=\"post\" action=\"/register\">\n\
         <input name=\"username\" value=\"{}\" minlength=\"3\" maxlength=\"50\" required>\n\
         <input type=\"email\" name=\"email\" value=\"{}\" required>\n\
         <input type=\"password\" name=\"password\" minlength=\"6\" required>\n\
         <button type=\"submit\">Register</button>\n</form>\n\
         <p><a href=\"/login\">Already registered?</a></p>",
        notice("error", error),
        escape(username),
        escape(email)
    );
    layout("Register", &body)
}

pub fn forgot_password(error: Option<&str>, success: Option<&str>) -> Html<String> {
    let body = format!(
        "<h1>Reset your password</h1>{}{}\n\
         <form method=\"post\" action=\"/forgot-password\">\n\
         <input type=\"email\" name=\"email\" required>\n\
         <button type=\"submit\">Send reset link</button>\n</form>",
        notice("error", error),
        notice("success", success)
    );
    layout("Forgot password", &body)
}

pub fn reset_password(token: &str, error: Option<&str>) -> Html<String> {
    let body = format!(
        "<h1>Choose a new password</h1>{}\n\
         <form method=\"post\" action=\"/reset-password/{}\">\n\
         <input type=\"password\" name=\"password\" minlength=\"6\" required>\n\
         <input type=\"password\" name=\"confirm_password\" minlength=\"6\" required>\n\
         <button type=\"submit\">Save</button>\n</form>",
        notice("error", error),
        escape(token)
    );
    layout("Reset password", &body)
}

// Kept inline so the page works without a static file route. Everything the
// server returns is written with `textContent`.
const INDEX_SCRIPT: &str = r#"<script>
const post = (url, body) => fetch(url, {
  method: "POST",
  credentials: "same-origin",
  headers: { "Content-Type": "application/json" },
  body: JSON.stringify(body),
}).then(async (res) => ({ ok: res.ok, data: await res.json() }));

const field = (parent, label, text) => {
  if (!text) return;
  const h = document.createElement("h3");
  h.textContent = label;
  const p = document.createElement("p");
  p.textContent = text;
  parent.append(h, p);
};

document.getElementById("transcript-form").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const out = document.getElementById("result");
  out.textContent = "Working...";
  const { ok, data } = await post("/api/transcript", { url: ev.target.url.value });
  out.textContent = "";
  if (!ok) { field(out, "Error", data.error); return; }
  field(out, "Title", data.videoTitle);
  field(out, "Introduction", data.introduction);
  field(out, "Summary", data.summary);
  field(out, "Main points", data.mainPoints);
  field(out, "Full content", data.fullContent);
});

let sessionId = sessionStorage.getItem("chatSession");
if (!sessionId) {
  sessionId = "session-" + Date.now();
  sessionStorage.setItem("chatSession", sessionId);
}

document.getElementById("chat-form").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const log = document.getElementById("chat-log");
  const message = ev.target.message.value;
  ev.target.message.value = "";
  field(log, "You", message);
  const { ok, data } = await post("/api/chat", { message, sessionId });
  field(log, ok ? "Assistant" : "Error", ok ? (data.output ?? JSON.stringify(data)) : data.error);
});
</script>"#;

pub fn index(user: &User) -> Html<String> {
    let body = format!(
        "{}\n<h1>TubeScribe</h1>\n\
         <form id=\"transcript-form\">\n\
         <input type=\"url\" name=\"url\" placeholder=\"https://www.youtube.com/watch?v=...\" required>\n\
         <button type=\"submit\">Transcribe</button>\n</form>\n\
         <section id=\"result\"></section>\n\
         <section id=\"chat\">\n<div id=\"chat-log\"></div>\n\
         <form id=\"chat-form\">\n<input name=\"message\" required>\n\
         <button type=\"submit\">Send</button>\n</form>\n</section>\n{}",
        nav(user),
        INDEX_SCRIPT
    );
    layout("Home", &body)
}

pub fn profile(user: &User, transcript_count: usize) -> Html<String> {
    let body = format!(
        "{}\n<h1>Profile</h1>\n<dl>\n<dt>Username</dt><dd>{}</dd>\n\
         <dt>Email</dt><dd>{}</dd>\n<dt>Member since</dt><dd>{}</dd>\n\
         <dt>Transcripts</dt><dd>{}</dd>\n</dl>",
        nav(user),
        escape(&user.username),
        escape(&user.email),
        user.created_at.date(),
        transcript_count
    );
    layout("Profile", &body)
}

pub fn my_files(user: &User, transcripts: &[TranscriptView]) -> Html<String> {
    let rows = if transcripts.is_empty() {
        "<p>No transcripts yet.</p>".to_owned()
    } else {
        let items: String = transcripts
            .iter()
            .map(|t| {
                format!(
                    "<li data-id=\"{}\"><a href=\"{}\">{}</a> <time>{}</time></li>\n",
                    t.id,
                    escape(&t.video_url),
                    escape(t.video_title.as_deref().unwrap_or(&t.video_url)),
                    escape(&t.created_at)
                )
            })
            .collect();
        format!("<ul>\n{items}</ul>")
    };
    let body = format!("{}\n<h1>My files</h1>\n{}", nav(user), rows);
    layout("My files", &body)
}
