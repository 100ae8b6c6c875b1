// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Static presentation assets. Data never enters these; the script reads
//! the `chart-data` and `chart-config` islands at load time.

pub const STYLE: &str = r#"
body{font-family:Segoe UI,Arial,sans-serif;margin:20px;background:#f5f5f5}
.container{max-width:1100px;margin:0 auto;background:#fff;padding:20px;border-radius:8px;box-shadow:0 4px 18px rgba(0,0,0,0.08)}
.chart-wrap{position:relative;padding:10px}
canvas{width:100% !important;height:100% !important}
.chart-overlay{position:absolute;background:transparent;cursor:crosshair}
.chart-tooltip{position:fixed;pointer-events:none;background:rgba(20,20,20,0.9);color:#fff;font-size:12px;padding:8px 10px;border-radius:6px;display:none;z-index:10;max-width:280px}
.chart-tooltip .row{display:flex;align-items:center;gap:6px;white-space:nowrap}
.chart-tooltip .title{font-weight:600;margin-bottom:4px}
.legend-box{border:1px solid rgba(0,0,0,0.06);padding:12px;border-radius:8px;margin-top:12px;display:flex;justify-content:center}
.legend-custom{display:flex;gap:12px;flex-wrap:wrap;align-items:center}
.legend-item{display:flex;align-items:center;gap:8px;font-size:13px;color:#fff;padding:8px 12px;border-radius:8px;font-weight:600}
.legend-color{width:12px;height:12px;border-radius:2px;display:inline-block;border:1px solid rgba(255,255,255,0.7)}
.chart-error{background:#fdecea;color:#611a15;border:1px solid #f5c6cb;padding:12px;border-radius:6px;margin:12px 0;font-weight:600}
.info{font-size:13px;color:#666;text-align:center;margin-top:10px}
details{margin-top:16px;font-size:12px;color:#444}
details pre{white-space:pre-wrap;word-break:break-word;background:#fafafa;padding:8px;border-radius:4px}
"#;

pub const SCRIPT: &str = r#"
(function(){
  function readIsland(id){
    var el = document.getElementById(id);
    return JSON.parse((el && el.textContent) || '{}');
  }
  function showError(message){
    var wrap = document.querySelector('.chart-wrap');
    var banner = document.createElement('div');
    banner.className = 'chart-error';
    banner.setAttribute('role', 'alert');
    banner.textContent = message;
    wrap.parentNode.insertBefore(banner, wrap);
  }
  function colorAt(color, i){
    if (Array.isArray(color)) return color[i] || '#777';
    return color || '#777';
  }
  function formatValue(v){
    return (typeof v === 'number' && isFinite(v)) ? v.toLocaleString() : '-';
  }
  function nearestIndex(positions, value){
    var n = positions.length;
    if (!n || isNaN(value)) return -1;
    var lo = 0, hi = n;
    while (lo < hi){
      var mid = (lo + hi) >> 1;
      if (positions[mid] < value) lo = mid + 1; else hi = mid;
    }
    if (lo === 0) return 0;
    if (lo === n) return n - 1;
    return (value - positions[lo - 1] <= positions[lo] - value) ? lo - 1 : lo;
  }
  function buildLegend(chartType, payload){
    var legend = document.getElementById('chart-legend');
    legend.innerHTML = '';
    function entry(color, text){
      var item = document.createElement('div');
      item.className = 'legend-item';
      item.style.background = color;
      var swatch = document.createElement('span');
      swatch.className = 'legend-color';
      swatch.style.background = color;
      var label = document.createElement('span');
      label.textContent = text;
      item.appendChild(swatch);
      item.appendChild(label);
      legend.appendChild(item);
    }
    if (chartType === 'pie' || chartType === 'doughnut'){
      var ds = payload.datasets[0] || {data: []};
      payload.labels.forEach(function(label, i){
        entry(colorAt(ds.backgroundColor, i), label + ': ' + formatValue(ds.data[i] || 0));
      });
      return;
    }
    payload.datasets.forEach(function(ds){
      var total = ds.data.reduce(function(acc, v){ return (typeof v === 'number') ? acc + v : acc; }, 0);
      entry(colorAt(ds.borderColor, 0), ds.label + ': ' + formatValue(total));
    });
  }
  function attachOverlay(chart, payload, axis){
    var wrap = document.querySelector('.chart-wrap');
    var overlay = document.createElement('div');
    overlay.className = 'chart-overlay';
    var panel = document.createElement('div');
    panel.className = 'chart-tooltip';
    wrap.appendChild(overlay);
    document.body.appendChild(panel);
    function place(){
      var area = chart.chartArea;
      var canvas = chart.canvas;
      overlay.style.left = (canvas.offsetLeft + area.left) + 'px';
      overlay.style.top = (canvas.offsetTop + area.top) + 'px';
      overlay.style.width = (area.right - area.left) + 'px';
      overlay.style.height = (area.bottom - area.top) + 'px';
    }
    function indexAt(px){
      var scale = chart.scales.x;
      if (axis.kind === 'time' && scale.type === 'time'){
        return nearestIndex(axis.positions, scale.getValueForPixel(px));
      }
      var offsets = payload.labels.map(function(_, i){ return scale.getPixelForValue(i); });
      return nearestIndex(offsets, px);
    }
    overlay.addEventListener('mousemove', function(evt){
      var rect = chart.canvas.getBoundingClientRect();
      var idx = indexAt(evt.clientX - rect.left);
      if (idx < 0) return;
      panel.innerHTML = '';
      var title = document.createElement('div');
      title.className = 'title';
      title.textContent = payload.labels[idx];
      panel.appendChild(title);
      payload.datasets.forEach(function(ds){
        var row = document.createElement('div');
        row.className = 'row';
        var swatch = document.createElement('span');
        swatch.className = 'legend-color';
        swatch.style.background = colorAt(ds.borderColor, idx);
        var text = document.createElement('span');
        text.textContent = ds.label + ': ' + formatValue(ds.data[idx]);
        row.appendChild(swatch);
        row.appendChild(text);
        panel.appendChild(row);
      });
      panel.style.display = 'block';
      var left = Math.min(evt.clientX + 14, window.innerWidth - panel.offsetWidth - 8);
      var top = Math.min(evt.clientY + 14, window.innerHeight - panel.offsetHeight - 8);
      panel.style.left = Math.max(8, left) + 'px';
      panel.style.top = Math.max(8, top) + 'px';
    });
    overlay.addEventListener('mouseleave', function(){ panel.style.display = 'none'; });
    place();
    window.addEventListener('resize', function(){ requestAnimationFrame(place); });
  }
  try{
    var payload = readIsland('chart-data');
    var config = readIsland('chart-config');
    payload.labels = payload.labels || [];
    payload.datasets = payload.datasets || [];
    var chartType = config.chartType || 'line';
    buildLegend(chartType, payload);
    if (typeof Chart === 'undefined'){
      showError('The chart library could not be loaded. The data is available in the section below.');
      return;
    }
    var radial = chartType === 'pie' || chartType === 'doughnut';
    var options = {
      responsive: true,
      maintainAspectRatio: false,
      animation: false,
      plugins: {legend: {display: false}, tooltip: {enabled: radial}}
    };
    if (radial){
      options.cutout = chartType === 'doughnut' ? '55%' : 0;
      payload.datasets.forEach(function(ds){ ds.hoverOffset = 12; ds.borderWidth = 1; });
    } else {
      options.scales = {y: {beginAtZero: true}};
      options.interaction = {mode: 'index', intersect: false};
    }
    var ctx = document.getElementById('chart-canvas').getContext('2d');
    var chart = new Chart(ctx, {type: chartType, data: payload, options: options});
    if (!radial) attachOverlay(chart, payload, config.axis || {kind: 'band'});
  }catch(e){
    console.error('chart init error', e);
    showError('The chart could not be drawn: ' + (e && e.message ? e.message : e));
  }
})();
"#;
