//! The single-page front end served at `/`.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>shortgrab</title>
<style>
  * { box-sizing: border-box; }
  body { margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center;
         font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
         background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 16px; }
  .card { background: #fff; border-radius: 24px; width: 100%; max-width: 520px; padding: 32px;
          box-shadow: 0 25px 50px -12px rgba(0,0,0,.25); }
  h1 { margin: 0 0 4px; font-size: 24px; color: #1f2937; text-align: center; }
  .sub { margin: 0 0 24px; color: #6b7280; text-align: center; font-size: 14px; }
  .row { position: relative; }
  input { width: 100%; padding: 14px 72px 14px 16px; border: 2px solid #e5e7eb; border-radius: 12px;
          font-size: 15px; background: #f9fafb; outline: none; }
  input:focus { border-color: #8b5cf6; background: #fff; }
  .paste { position: absolute; right: 8px; top: 50%; transform: translateY(-50%); border: 0; background: none;
           color: #7c3aed; cursor: pointer; font-size: 14px; padding: 6px 10px; border-radius: 8px; }
  .go { margin-top: 12px; width: 100%; padding: 14px; border: 0; border-radius: 12px; color: #fff; font-size: 16px;
        font-weight: 600; cursor: pointer; background: linear-gradient(90deg, #8b5cf6, #ec4899); }
  .go:disabled { opacity: .5; cursor: not-allowed; }
  .status { margin-top: 20px; border-radius: 12px; padding: 14px; border: 1px solid; display: none; }
  .status.info { display: block; background: #eff6ff; border-color: #bfdbfe; color: #1d4ed8; }
  .status.error { display: block; background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
  .status.done { display: block; background: #f0fdf4; border-color: #bbf7d0; color: #166534; }
  .preview { display: flex; justify-content: center; margin: 12px 0; }
  .preview video, .preview img { max-width: 100%; max-height: 320px; border-radius: 12px; }
  .save { display: block; text-align: center; padding: 12px; border-radius: 10px; background: #22c55e;
          color: #fff; text-decoration: none; font-weight: 600; }
  .platforms { margin-top: 24px; padding-top: 16px; border-top: 1px solid #f3f4f6; text-align: center;
               font-size: 12px; color: #9ca3af; }
  .platforms span { display: inline-block; margin: 4px; padding: 4px 10px; background: #f9fafb; border-radius: 999px; }
</style>
</head>
<body>
<div class="card">
  <h1>shortgrab</h1>
  <p class="sub">Download short videos from TikTok, Douyin, Xiaohongshu, YouTube and more</p>
  <div class="row">
    <input id="url" type="text" placeholder="Paste a link or share text here">
    <button class="paste" id="paste" type="button">Paste</button>
  </div>
  <button class="go" id="go" type="button">Download</button>
  <div class="status" id="status"></div>
  <div class="platforms">
    <span>TikTok</span><span>Douyin</span><span>Xiaohongshu</span><span>YouTube</span><span>Bilibili</span><span>Instagram</span>
  </div>
</div>
<script>
  const URL_PATTERN = /https?:\/\/[^\s<>"{}|\\^`\[\]]+/;
  const $ = (id) => document.getElementById(id);
  let taskId = null;
  let timer = null;

  function showText(kind, text) {
    const el = $('status');
    el.className = 'status ' + kind;
    el.textContent = text;
  }

  function setBusy(busy) {
    $('go').disabled = busy;
    $('go').textContent = busy ? 'Downloading...' : 'Download';
  }

  function showReady(task) {
    const el = $('status');
    el.className = 'status done';
    el.textContent = '';

    const size = (task.file_size / (1024 * 1024)).toFixed(2) + ' MB';
    const res = task.width && task.height ? ' • ' + task.width + 'x' + task.height : '';
    const count = task.media_count > 1 ? ' • ' + task.media_count + ' images' : '';
    const head = document.createElement('div');
    head.textContent = 'Ready: ' + size + res + count;
    el.appendChild(head);

    const box = document.createElement('div');
    box.className = 'preview';
    const media = document.createElement(task.kind === 'image' ? 'img' : 'video');
    media.src = '/api/preview/' + taskId;
    if (task.kind !== 'image') {
      media.controls = true;
      media.playsInline = true;
      media.preload = 'metadata';
    }
    box.appendChild(media);
    el.appendChild(box);

    const link = document.createElement('a');
    link.className = 'save';
    link.href = '/api/file/' + taskId;
    link.download = task.file_name || '';
    link.textContent = 'Save file';
    el.appendChild(link);
  }

  async function poll() {
    if (!taskId) return;
    try {
      const res = await fetch('/api/status/' + taskId);
      const task = await res.json();
      if (task.status === 'completed') {
        clearInterval(timer);
        setBusy(false);
        showReady(task);
      } else if (task.status === 'failed') {
        clearInterval(timer);
        setBusy(false);
        showText('error', task.error || 'Download failed');
      } else {
        showText('info', task.progress || 'Downloading...');
      }
    } catch (e) {
      console.log('status check failed', e);
    }
  }

  async function start() {
    const text = $('url').value.trim();
    if (!text) {
      showText('error', 'Please paste a video link');
      return;
    }
    setBusy(true);
    try {
      const res = await fetch('/api/download', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ url: text })
      });
      const data = await res.json();
      if (data.task_id) {
        taskId = data.task_id;
        showText('info', 'Downloading...');
        clearInterval(timer);
        timer = setInterval(poll, 1500);
      } else {
        setBusy(false);
        showText('error', data.error || 'Something went wrong');
      }
    } catch (e) {
      setBusy(false);
      showText('error', 'Cannot reach the server');
    }
  }

  $('go').addEventListener('click', start);
  $('url').addEventListener('keypress', (e) => { if (e.key === 'Enter') start(); });
  $('paste').addEventListener('click', async () => {
    try {
      const text = await navigator.clipboard.readText();
      const m = text.match(URL_PATTERN);
      $('url').value = m ? m[0] : text;
    } catch (e) {
      console.log('clipboard unavailable');
    }
  });
</script>
</body>
</html>
"#;
