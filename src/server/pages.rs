//! Built-in HTML pages, used when no `pages_dir` override exists

/// A static page served by the façade
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// Route segment and override file stem (`index` is served at `/`)
    pub name: &'static str,
    pub title: &'static str,
    pub blurb: &'static str,
    /// Workflow submitted by the page's form, if it has one
    pub workflow: Option<&'static str>,
}

pub const PAGES: &[Page] = &[
    Page {
        name: "index",
        title: "EcoOptima",
        blurb: "Tree-planting advice for communities, schools, households, and governments.",
        workflow: Some("community"),
    },
    Page {
        name: "about",
        title: "About EcoOptima",
        blurb: "EcoOptima chains specialist advisors to rank tree species and estimate local returns.",
        workflow: None,
    },
    Page {
        name: "community",
        title: "Community planting",
        blurb: "Describe your neighborhood project: location, scale, budget, and time horizon.",
        workflow: Some("community"),
    },
    Page {
        name: "academic",
        title: "Academic planting",
        blurb: "Campus and schoolyard projects.",
        workflow: Some("community"),
    },
    Page {
        name: "consumer",
        title: "Household planting",
        blurb: "Backyard and single-tree projects.",
        workflow: Some("consumer"),
    },
    Page {
        name: "government",
        title: "Municipal planting",
        blurb: "Street tree and public land programs.",
        workflow: Some("community"),
    },
];

const SCRIPT: &str = r#"<script>
const form = document.getElementById('ask');
const out = document.getElementById('result');
const imgs = document.getElementById('charts');
form.addEventListener('submit', async (event) => {
  event.preventDefault();
  out.textContent = 'Working...';
  imgs.innerHTML = '';
  const resp = await fetch('/response', { method: 'POST', body: new URLSearchParams(new FormData(form)) });
  const body = await resp.json();
  out.textContent = body.result ?? body.error;
  for (const url of body.img_urls ?? []) {
    const img = document.createElement('img');
    img.src = url;
    imgs.appendChild(img);
  }
});
document.getElementById('reset').addEventListener('click', async () => {
  const resp = await fetch('/reset', { method: 'POST' });
  out.textContent = (await resp.json()).message;
  imgs.innerHTML = '';
});
</script>"#;

fn nav() -> String {
    PAGES
        .iter()
        .map(|p| {
            let href = if p.name == "index" { "/".to_string() } else { format!("/{}", p.name) };
            format!(r#"<a href="{}">{}</a>"#, href, p.title)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn form(workflow: &str) -> String {
    format!(
        r#"<form id="ask">
<textarea name="userInput" rows="6" cols="80"></textarea>
<input type="hidden" name="workflow" value="{workflow}">
<select name="mode"><option value="analyze">New analysis</option><option value="followup">Follow-up</option></select>
<button type="submit">Ask</button>
<button type="button" id="reset">Reset conversation</button>
</form>
<pre id="result"></pre>
<div id="charts"></div>
{SCRIPT}"#
    )
}

/// Render the built-in page named `name`
pub fn render(name: &str) -> String {
    let page = PAGES.iter().find(|p| p.name == name).unwrap_or(&PAGES[0]);
    let body = page.workflow.map(form).unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<nav>{nav}</nav>\n<h1>{title}</h1>\n<p>{blurb}</p>\n{body}\n</body></html>\n",
        title = page.title,
        nav = nav(),
        blurb = page.blurb,
        body = body,
    )
}
