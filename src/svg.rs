//! SVG and HTML markup for a scene.

use crate::interaction::{TooltipRow, ViewTransform};
use crate::scene::Scene;
use std::fmt::Write;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The `<svg class="svg">` element: one transformed group holding countries
/// then meteors.
pub fn render_svg(scene: &Scene, transform: ViewTransform) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg class="svg" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = scene.width,
        h = scene.height
    );
    let _ = writeln!(svg, r#"<g transform="{}">"#, transform.attribute());

    for (i, country) in scene.countries.iter().enumerate() {
        let _ = writeln!(
            svg,
            r#"<path class="country" data-index="{}" data-id="{}" d="{}" fill="{}"/>"#,
            i,
            escape(&country.id),
            country.path,
            country.fill
        );
    }

    for (i, meteor) in scene.meteors.iter().enumerate() {
        let _ = writeln!(
            svg,
            r#"<circle class="meteor" data-index="{}" cx="{:.2}" cy="{:.2}" r="{}" stroke="{}" stroke-width="{}" fill="{}"/>"#,
            i, meteor.cx, meteor.cy, meteor.r, meteor.stroke, meteor.stroke_width, meteor.fill
        );
    }

    svg.push_str("</g>\n</svg>\n");
    svg
}

/// Inner HTML of the `.tool` element.
pub fn tooltip_html(rows: &[TooltipRow]) -> String {
    let mut html = String::from("<ul>");
    for row in rows {
        let _ = write!(
            html,
            r#"<li><span class="title">{}: </span>{}</li>"#,
            row.label,
            escape(&row.value)
        );
    }
    html.push_str("</ul>");
    html
}

const PAGE_STYLE: &str = r#"
body { margin: 0; overflow: hidden; font-family: sans-serif; }
.graph { position: relative; }
.country:hover, .active_country { fill: #aaa; }
.tool { position: absolute; display: none; background: rgba(255,255,255,0.9); border: 1px solid #999; padding: 4px 8px; pointer-events: none; }
.tool ul { list-style: none; margin: 0; padding: 0; }
.tool .title { font-weight: bold; }
"#;

// Pointer handling lives server-side; the page only forwards gestures and
// applies what comes back.
const PAGE_SCRIPT: &str = r#"
const svg = document.querySelector('.svg');
const group = svg.querySelector('g');
const tool = document.querySelector('.tool');
let view = { x: 0, y: 0, k: 1 };
let drag = null;
let active = null;

// View steps run one at a time, each built from the view the previous one
// produced. Pan deltas arriving while a step is pending are merged into it.
const steps = [];
let running = false;
let pan = null;
let hoverSeq = 0;

function query(params) {
  return new URLSearchParams(Object.assign({ x: view.x, y: view.y, k: view.k }, params));
}
function pointer(e) {
  const box = svg.getBoundingClientRect();
  return { px: e.clientX - box.left, py: e.clientY - box.top };
}
function wheelDelta(e) {
  return e.deltaY * (e.deltaMode ? 120 : 1);
}
async function applyView(url) {
  const update = await (await fetch(url)).json();
  view = update.transform;
  group.setAttribute('transform', update.attribute);
  svg.querySelectorAll('.meteor').forEach(c => c.setAttribute('stroke-width', update.stroke_width));
}
function enqueue(step) {
  steps.push(step);
  drain();
}
async function drain() {
  if (running) return;
  running = true;
  try {
    while (steps.length) {
      await applyView(steps.shift()());
    }
  } finally {
    running = false;
  }
}
function panBy(dx, dy) {
  if (pan) {
    pan.dx += dx;
    pan.dy += dy;
    return;
  }
  pan = { dx, dy };
  enqueue(() => {
    const d = pan;
    pan = null;
    return '/api/pan?' + query(d);
  });
}
function hideHover() {
  hoverSeq++;
  tool.style.display = 'none';
  if (active !== null) {
    svg.querySelector('.country[data-index="' + active + '"]').classList.remove('active_country');
    active = null;
  }
}
svg.addEventListener('wheel', e => {
  e.preventDefault();
  const p = pointer(e);
  const delta_y = wheelDelta(e);
  enqueue(() => '/api/wheel?' + query({ delta_y, px: p.px, py: p.py }));
}, { passive: false });
svg.addEventListener('dblclick', e => {
  const p = pointer(e);
  const shift = e.shiftKey;
  enqueue(() => '/api/dblclick?' + query({ px: p.px, py: p.py, shift }));
});
svg.addEventListener('mousedown', e => { drag = { x: e.clientX, y: e.clientY }; });
window.addEventListener('mouseup', () => { drag = null; });
svg.addEventListener('mouseleave', hideHover);
svg.addEventListener('mousemove', async e => {
  if (drag) {
    const dx = e.clientX - drag.x, dy = e.clientY - drag.y;
    drag = { x: e.clientX, y: e.clientY };
    return panBy(dx, dy);
  }
  const seq = ++hoverSeq;
  const p = pointer(e);
  const params = { px: p.px, py: p.py, page_x: e.pageX, page_y: e.pageY };
  if (active !== null) params.active = active;
  const hover = await (await fetch('/api/hover?' + query(params))).json();
  // A later move or a leave supersedes this answer
  if (seq !== hoverSeq) return;
  hover.classes.forEach(c => {
    svg.querySelector('.country[data-index="' + c.index + '"]').classList.toggle('active_country', c.active);
  });
  active = hover.country;
  const t = hover.tooltip;
  tool.style.display = t.display === 'default' ? '' : t.display;
  if (t.left !== null) tool.style.left = t.left + 'px';
  if (t.top !== null) tool.style.top = t.top + 'px';
  tool.innerHTML = hover.html;
});
"#;

/// Standalone page: `.graph` container with the map and a hidden `.tool`.
pub fn render_page(scene: &Scene, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{style}</style>\n</head>\n<body>\n<div class=\"graph\">\n{svg}<div class=\"tool\"></div>\n</div>\n<script>{script}</script>\n</body>\n</html>\n",
        title = escape(title),
        style = PAGE_STYLE,
        svg = render_svg(scene, ViewTransform::IDENTITY),
        script = PAGE_SCRIPT,
    )
}
