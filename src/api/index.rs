use axum::response::Html;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>inkframe</title>
<style>
body { font-family: sans-serif; max-width: 32em; margin: 3em auto; padding: 0 1em; }
pre { background: #f4f4f4; padding: 1em; white-space: pre-wrap; }
img { max-width: 100%; margin-top: 1em; }
</style>
</head>
<body>
<h1>inkframe</h1>
<form id="upload" action="/api/upload" method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept="image/jpeg,image/png,image/webp" required>
  <button type="submit">Show on frame</button>
</form>
<pre id="result"></pre>
<img id="preview" alt="" hidden>
<script>
document.getElementById('upload').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const out = document.getElementById('result');
  const img = document.getElementById('preview');
  out.textContent = 'Refreshing panel, this takes about 30 seconds...';
  img.hidden = true;
  const res = await fetch('/api/upload', { method: 'POST', body: new FormData(ev.target) });
  const body = await res.json();
  out.textContent = JSON.stringify(body, null, 2);
  if (body.preview_url) { img.src = body.preview_url; img.hidden = false; }
});
</script>
</body>
</html>
"#;

/// Minimal upload form
pub async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
