//! The browser form. The API key lives only in this page's memory and in
//! the server-side session it creates.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Health Checkup Analyzer</title>
<style>
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { text-align: center; color: #2E86AB; margin-bottom: 0.25rem; }
.sub { text-align: center; color: #666; margin-bottom: 2rem; }
label { display: block; margin-top: 1rem; font-weight: 600; }
input[type=text], input[type=password], select { width: 100%; padding: 0.5rem; box-sizing: border-box; }
button { margin-top: 1.5rem; padding: 0.75rem 1.5rem; background: #2E86AB; color: #fff; border: 0; border-radius: 6px; font-size: 1rem; cursor: pointer; }
button:disabled { opacity: 0.6; cursor: wait; }
.notice { padding: 1rem; border-radius: 6px; margin-top: 1.5rem; }
.error { background: #f8d7da; border: 1px solid #f5c6cb; }
.success { background: #d4edda; border: 1px solid #c3e6cb; }
pre { white-space: pre-wrap; background: #f8f9fa; padding: 1rem; max-height: 240px; overflow: auto; }
.details { margin-top: 1rem; color: #444; }
.details span { display: inline-block; margin-right: 1.5rem; }
iframe { width: 100%; min-height: 640px; border: 1px solid #ddd; border-radius: 6px; margin-top: 1.5rem; }
footer { text-align: center; color: #666; margin-top: 3rem; font-size: 0.85rem; }
</style>
</head>
<body>
<h1>🏥 Health Checkup Analyzer</h1>
<div class="sub">AI-Powered Health Report Analysis with Personalized Recommendations</div>

<form id="analyze-form">
  <label for="api_key">OpenAI API Key</label>
  <input type="password" id="api_key" autocomplete="off" required>

  <label for="language">Language</label>
  <select id="language" name="language">
    <option>English</option>
    <option>Hindi</option>
    <option>Hinglish</option>
  </select>

  <label for="patient_name">Patient Name (Optional)</label>
  <input type="text" id="patient_name" name="patient_name" value="Patient">

  <label for="format">Report Format</label>
  <select id="format" name="format">
    <option value="html">HTML (print to PDF)</option>
    <option value="pdf">PDF</option>
  </select>

  <label for="file">Health Report (PDF, PNG, JPG)</label>
  <input type="file" id="file" name="file" accept=".pdf,.png,.jpg,.jpeg" required>

  <label><input type="checkbox" id="preview"> Show extracted text preview</label>

  <button type="submit" id="submit">🔬 Analyze Health Report</button>
</form>

<div id="status"></div>
<div id="details" class="details" hidden></div>
<pre id="preview-text" hidden></pre>
<iframe id="report" title="Analysis report" sandbox hidden></iframe>

<footer>⚠️ This tool is for informational purposes only. Always consult healthcare professionals for medical advice.</footer>

<script>
let sessionId = null;

async function ensureSession(apiKey, preview) {
  const body = JSON.stringify({ api_key: apiKey, preview: preview });
  const headers = { "Content-Type": "application/json" };
  if (sessionId) {
    const res = await fetch("/api/sessions/" + sessionId, { method: "PUT", headers, body });
    if (res.ok) return;
  }
  const res = await fetch("/api/sessions", { method: "POST", headers, body });
  const json = await res.json();
  if (!res.ok) throw new Error(json.meta.message);
  sessionId = json.data.session_id;
}

function show(kind, message) {
  const status = document.getElementById("status");
  status.className = "notice " + kind;
  status.textContent = message;
}

function uploadData(form, extraction) {
  const data = new FormData(form);
  data.delete("api_key");
  if (extraction && extraction.extracted_text) {
    data.delete("file");
    data.set("text", extraction.extracted_text);
    if (extraction.page_count) data.set("page_count", String(extraction.page_count));
  }
  return data;
}

function showDetails(extraction) {
  const details = document.getElementById("details");
  details.replaceChildren();
  const items = [
    "📄 " + (extraction.file_name || "upload"),
    "📦 " + (extraction.size_bytes / 1024).toFixed(1) + " KB",
    "🔤 " + extraction.text_length + " characters",
  ];
  if (extraction.page_count) items.push("📑 " + extraction.page_count + " pages");
  for (const item of items) {
    const span = document.createElement("span");
    span.textContent = item;
    details.appendChild(span);
  }
  details.hidden = false;
}

document.getElementById("analyze-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = event.target;
  const button = document.getElementById("submit");
  const preview = document.getElementById("preview").checked;
  const report = document.getElementById("report");
  button.disabled = true;
  report.hidden = true;
  try {
    await ensureSession(document.getElementById("api_key").value, preview);
    const headers = { "x-session-id": sessionId };

    let extraction = null;
    if (preview) {
      show("success", "🔍 Extracting text from your report...");
      const res = await fetch("/api/extract", { method: "POST", headers, body: uploadData(form, null) });
      const json = await res.json();
      if (!res.ok) throw new Error(json.meta.message);
      extraction = json.data;
      showDetails(extraction);
      const pre = document.getElementById("preview-text");
      pre.textContent = extraction.extracted_text || "";
      pre.hidden = false;
    }

    show("success", "🤖 Analyzing your health report...");
    const res = await fetch("/api/analyze", { method: "POST", headers, body: uploadData(form, extraction) });
    if (!res.ok) {
      const json = await res.json();
      throw new Error(json.meta.message);
    }
    const disposition = res.headers.get("content-disposition") || "";
    const match = disposition.match(/filename="([^"]+)"/);
    const blob = await res.blob();
    const link = document.createElement("a");
    link.href = URL.createObjectURL(blob);
    link.download = match ? match[1] : "health_analysis";
    link.click();
    if (blob.type.startsWith("text/html")) {
      report.srcdoc = await blob.text();
      report.hidden = false;
    }
    show("success", "✅ Analysis completed! Your report has been downloaded.");
  } catch (err) {
    show("error", "❌ " + err.message);
  } finally {
    button.disabled = false;
  }
});
</script>
</body>
</html>
"#;
