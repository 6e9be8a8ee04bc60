//! The single dashboard page.
//!
//! Dropdowns are filled from `/api/options`. Changing the category refreshes
//! all three charts; changing the month refreshes only the map.

const TITLE_PLACEHOLDER: &str = "{{TITLE}}";

pub const DASHBOARD_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
  <style>
    body { font-family: system-ui, sans-serif; margin: 1.5rem; color: #1f2933; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    select { min-width: 20rem; padding: 0.3rem; margin-top: 0.25rem; }
    .chart { margin-top: 1rem; }
    #status { color: #b91c1c; margin-top: 0.5rem; }
  </style>
</head>
<body>
  <h2>{{TITLE}}</h2>

  <label for="crime-dropdown">Select Crime Type:</label>
  <select id="crime-dropdown"></select>

  <label for="month-dropdown">Select Month-Year:</label>
  <select id="month-dropdown"></select>

  <div id="status"></div>

  <div id="zip-map" class="chart"></div>

  <h3>Monthly Trend for Selected Crime Type</h3>
  <div id="trend-line" class="chart"></div>

  <h3>Hourly Trend for Selected Crime Type</h3>
  <div id="hourly-line" class="chart"></div>

  <script>
    const crime = document.getElementById("crime-dropdown");
    const month = document.getElementById("month-dropdown");
    const status = document.getElementById("status");

    function fill(select, values, selected) {
      for (const value of values) {
        const option = document.createElement("option");
        option.value = value;
        option.textContent = value;
        option.selected = value === selected;
        select.appendChild(option);
      }
    }

    async function draw(target, path, params) {
      const query = new URLSearchParams(params);
      const response = await fetch(`${path}?${query}`);
      if (!response.ok) {
        status.textContent = await response.text();
        return;
      }
      status.textContent = "";
      const figure = await response.json();
      await Plotly.react(target, figure.data, figure.layout, { responsive: true });
    }

    function drawMap() {
      return draw("zip-map", "/api/map", { category: crime.value, month: month.value });
    }

    function drawTrends() {
      return Promise.all([
        draw("trend-line", "/api/trend/monthly", { category: crime.value }),
        draw("hourly-line", "/api/trend/hourly", { category: crime.value }),
      ]);
    }

    async function init() {
      const response = await fetch("/api/options");
      const options = await response.json();
      fill(crime, options.categories, options.default_category);
      fill(month, options.months, options.default_month);

      crime.addEventListener("change", () => { drawMap(); drawTrends(); });
      month.addEventListener("change", drawMap);

      await Promise.all([drawMap(), drawTrends()]);
    }

    init().catch((err) => { status.textContent = String(err); });
  </script>
</body>
</html>
"#;

/// Render the dashboard page with the given heading.
#[must_use]
pub fn render_page(title: &str) -> String {
    DASHBOARD_HTML.replace(TITLE_PLACEHOLDER, &escape_html(title))
}

fn escape_html(text: &str) -> String {
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
