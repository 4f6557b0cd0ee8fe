use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// Render answer Markdown (with tables, strikethrough and task lists) to HTML.
///
/// Raw HTML in the answer is shown as text, and links or images with a
/// script URL lose their target.
pub fn render_markdown(text: &str) -> String {
	let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
	let events = Parser::new_ext(text, options).map(|event| match event {
		Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
		Event::Start(Tag::Link {
			link_type,
			dest_url,
			title,
			id,
		}) => Event::Start(Tag::Link {
			link_type,
			dest_url: safe_url(dest_url),
			title,
			id,
		}),
		Event::Start(Tag::Image {
			link_type,
			dest_url,
			title,
			id,
		}) => Event::Start(Tag::Image {
			link_type,
			dest_url: safe_url(dest_url),
			title,
			id,
		}),
		other => other,
	});

	let mut out = String::with_capacity(text.len() * 3 / 2);
	html::push_html(&mut out, events);
	out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
	let scheme = url.trim_start().to_ascii_lowercase();
	if ["javascript:", "vbscript:", "data:"].iter().any(|s| scheme.starts_with(s)) {
		CowStr::Borrowed("#")
	} else {
		url
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_common_answer_markup() {
		let html = render_markdown("## Ginseng\n\n**Tonifies** qi.\n\n- spleen\n- lung\n");
		assert!(html.contains("<h2>Ginseng</h2>"), "{html}");
		assert!(html.contains("<strong>Tonifies</strong>"), "{html}");
		assert!(html.contains("<li>spleen</li>"), "{html}");
	}

	#[test]
	fn tables_are_rendered() {
		let html = render_markdown("| herb | use |\n|---|---|\n| ginseng | qi |\n");
		assert!(html.contains("<table>"), "{html}");
		assert!(html.contains("<td>ginseng</td>"), "{html}");
	}

	#[test]
	fn raw_html_is_escaped() {
		let html = render_markdown("<script>alert(1)</script>\n\nok <b>bold</b>");
		assert!(!html.contains("<script>"), "{html}");
		assert!(!html.contains("<b>"), "{html}");
		assert!(html.contains("&lt;script&gt;"), "{html}");
	}

	#[test]
	fn script_links_lose_their_target() {
		let html = render_markdown("[click](javascript:alert(1)) and [docs](https://example.org)");
		assert!(!html.contains("javascript:"), "{html}");
		assert!(html.contains(r##"href="#""##), "{html}");
		assert!(html.contains(r#"href="https://example.org""#), "{html}");
	}
}
