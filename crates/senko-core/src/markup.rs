//! Message content transform.
//!
//! Turns raw turn text into the markup a render surface displays. The transform is a fixed,
//! ordered list of independent rules applied left to right over one accumulating string.
//! Later rules see the output of earlier ones, so the order is part of the contract:
//!
//! 1. escape `<` / `>`
//! 2. fenced code blocks (shielded from every later rule)
//! 3. inline code spans
//! 4. headings `#`, `##`, `###`
//! 5. horizontal rules
//! 6. block quotes
//! 7. bullet lists
//! 8. numbered lists
//! 9. links (new browsing context, no opener)
//! 10. bold
//! 11. italic (stage directions such as `*smiles*`)
//! 12. line breaks
//!
//! Line-anchored rules treat `\r\n` as one line end. Inside a rule `.` never matches `\r`,
//! and list numbers are ASCII digits only.
//!
//! Every rule is a single greedy regex pass. Unbalanced asterisks therefore produce partially
//! italicized runs; existing content depends on that, so there is no smarter parser here.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Opens a shielded fenced-code placeholder.
const SHIELD_OPEN: char = '\u{E000}';
/// Closes a shielded fenced-code placeholder.
const SHIELD_CLOSE: char = '\u{E001}';

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mR)^### (.*)$").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mR)^## (.*)$").unwrap());
static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mR)^# (.*)$").unwrap());
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mR)^[-*]{3,}$").unwrap());
static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mR)^&gt; (.*)$").unwrap());
static BULLET_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^(?:\s*[-*] .+\n)+").unwrap());
static BULLET_MARK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*]\s*").unwrap());
static NUMBERED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^(?:\s*[0-9]+\. .+\n)+").unwrap());
static NUMBERED_MARK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+\. ").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?R)\*\*(.*?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?R)\*(.*?)\*").unwrap());
static SHIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static LINE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<br>|</li>").unwrap());

/// Working buffer threaded through the rule list.
struct Pass {
    text: String,
    /// Rendered fenced blocks, addressed by placeholder index.
    shielded: Vec<String>,
}

type Rule = fn(&mut Pass);

const RULES: [Rule; 12] = [
    escape,
    fenced_code,
    inline_code,
    headings,
    horizontal_rules,
    block_quotes,
    bullet_lists,
    numbered_lists,
    links,
    bold,
    italic,
    line_breaks,
];

/// Renders raw turn text to display markup.
pub fn render(raw: &str) -> String {
    let mut pass = Pass {
        text: raw.to_string(),
        shielded: Vec::new(),
    };
    for rule in RULES {
        rule(&mut pass);
    }
    unshield(pass)
}

/// Removes every `<...>` tag from `text`.
pub fn strip_markup(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

/// Normalized form used for text-based turn lookup: tags stripped, whitespace trimmed.
pub fn normalize(text: &str) -> String {
    strip_markup(text).trim().to_string()
}

/// Text a reader sees for rendered markup: tags stripped and the escaped characters restored.
pub fn visible_text(markup: &str) -> String {
    strip_markup(markup)
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#xE000;", "\u{E000}")
        .replace("&#xE001;", "\u{E001}")
}

/// Terminal rendition of markup: like [`visible_text`], but line breaks survive, list items
/// get a `- ` bullet and rules become `---`.
pub fn plain_text(markup: &str) -> String {
    let lined = LINE_END
        .replace_all(markup, "\n")
        .replace("<li>", "- ")
        .replace("<hr>", "---");
    visible_text(&lined).trim_end().to_string()
}

fn replace(re: &Regex, text: &mut String, replacement: &str) {
    *text = re.replace_all(text.as_str(), replacement).into_owned();
}

fn escape(pass: &mut Pass) {
    let mut out = String::with_capacity(pass.text.len());
    for ch in pass.text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            // Placeholder characters in user text must not be mistaken for shields.
            SHIELD_OPEN => out.push_str("&#xE000;"),
            SHIELD_CLOSE => out.push_str("&#xE001;"),
            _ => out.push(ch),
        }
    }
    pass.text = out;
}

fn fenced_code(pass: &mut Pass) {
    let shielded = &mut pass.shielded;
    pass.text = FENCED_CODE
        .replace_all(&pass.text, |caps: &Captures| {
            let index = shielded.len();
            shielded.push(format!("<pre><code>{}</code></pre>", &caps[1]));
            format!("{SHIELD_OPEN}{index}{SHIELD_CLOSE}")
        })
        .into_owned();
}

fn inline_code(pass: &mut Pass) {
    replace(&INLINE_CODE, &mut pass.text, "<code>${1}</code>");
}

fn headings(pass: &mut Pass) {
    replace(&H3, &mut pass.text, "<h3>${1}</h3>");
    replace(&H2, &mut pass.text, "<h2>${1}</h2>");
    replace(&H1, &mut pass.text, "<h1>${1}</h1>");
}

fn horizontal_rules(pass: &mut Pass) {
    replace(&RULE, &mut pass.text, "<hr>");
}

fn block_quotes(pass: &mut Pass) {
    replace(&QUOTE, &mut pass.text, "<blockquote>${1}</blockquote>");
}

/// Wraps each run of list lines in `tag`, one `<li>` per line with its marker removed.
///
/// A run only includes newline-terminated lines and swallows the final newline.
fn wrap_list(text: &mut String, run: &Regex, marker: &Regex, tag: &str) {
    *text = run
        .replace_all(text.as_str(), |caps: &Captures| {
            let items: String = caps[0]
                .trim()
                .split('\n')
                .map(|line| format!("<li>{}</li>", marker.replace(line, "")))
                .collect();
            format!("<{tag}>{items}</{tag}>")
        })
        .into_owned();
}

fn bullet_lists(pass: &mut Pass) {
    wrap_list(&mut pass.text, &BULLET_RUN, &BULLET_MARK, "ul");
}

fn numbered_lists(pass: &mut Pass) {
    wrap_list(&mut pass.text, &NUMBERED_RUN, &NUMBERED_MARK, "ol");
}

fn links(pass: &mut Pass) {
    pass.text = LINK
        .replace_all(&pass.text, |caps: &Captures| {
            let href = caps[2].replace('"', "&quot;");
            format!(
                r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                &caps[1]
            )
        })
        .into_owned();
}

fn bold(pass: &mut Pass) {
    replace(&BOLD, &mut pass.text, "<strong>${1}</strong>");
}

fn italic(pass: &mut Pass) {
    replace(&ITALIC, &mut pass.text, "<em>${1}</em>");
}

fn line_breaks(pass: &mut Pass) {
    if pass.text.contains('\n') {
        pass.text = pass.text.replace('\n', "<br>");
    }
}

fn unshield(pass: Pass) -> String {
    if pass.shielded.is_empty() {
        return pass.text;
    }
    SHIELD
        .replace_all(&pass.text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| pass.shielded.get(index))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_keeps_lines_and_bullets() {
        let markup = render("*hi*\n- one\n- two\nbye <3");
        assert_eq!(plain_text(&markup), "hi\n- one\n- two\nbye <3");
        assert_eq!(plain_text(&render("a\n---\nb")), "a\n---\nb");
        assert_eq!(plain_text(&render("a\nb <c>")), "a\nb <c>");
    }

    #[test]
    fn escapes_angle_brackets_before_anything_else() {
        assert_eq!(
            render("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn fenced_code_is_not_transformed_further() {
        let out = render("look:\n```\nlet x = *y*;\n# not a heading\n```\ndone *ok*");
        assert_eq!(
            out,
            "look:<br><pre><code>\nlet x = *y*;\n# not a heading\n</code></pre><br>done <em>ok</em>"
        );
    }

    #[test]
    fn fenced_code_keeps_escaped_markup() {
        assert_eq!(
            render("```<b>```"),
            "<pre><code>&lt;b&gt;</code></pre>"
        );
    }

    #[test]
    fn inline_code_does_not_span_lines() {
        assert_eq!(render("use `foo` here"), "use <code>foo</code> here");
        assert_eq!(render("`a\nb`"), "`a<br>b`");
    }

    #[test]
    fn headings_levels_one_to_three() {
        assert_eq!(
            render("# One\n## Two\n### Three\n#### Four"),
            "<h1>One</h1><br><h2>Two</h2><br><h3>Three</h3><br>#### Four"
        );
    }

    #[test]
    fn horizontal_rule_needs_three_marks() {
        assert_eq!(render("a\n---\nb"), "a<br><hr><br>b");
        assert_eq!(render("a\n--\nb"), "a<br>--<br>b");
    }

    #[test]
    fn block_quote_matches_escaped_marker() {
        assert_eq!(
            render("> wise words"),
            "<blockquote>wise words</blockquote>"
        );
    }

    #[test]
    fn bullet_run_becomes_one_list() {
        assert_eq!(
            render("- one\n- two\n* three\nafter"),
            "<ul><li>one</li><li>two</li><li>three</li></ul>after"
        );
    }

    #[test]
    fn trailing_list_line_without_newline_stays_plain() {
        assert_eq!(render("- only"), "- only");
    }

    #[test]
    fn numbered_run_becomes_ordered_list() {
        assert_eq!(
            render("1. first\n2. second\nend"),
            "<ol><li>first</li><li>second</li></ol>end"
        );
    }

    #[test]
    fn links_open_in_new_context_without_opener() {
        assert_eq!(
            render("see [docs](https://example.com/a)"),
            r#"see <a href="https://example.com/a" target="_blank" rel="noopener noreferrer">docs</a>"#
        );
    }

    #[test]
    fn link_href_cannot_break_out_of_attribute() {
        let out = render(r#"[x](a" onclick="b)"#);
        assert!(out.contains(r#"href="a&quot; onclick=&quot;b""#));
    }

    #[test]
    fn bold_is_consumed_before_italic() {
        assert_eq!(
            render("**bold** and *smiles*"),
            "<strong>bold</strong> and <em>smiles</em>"
        );
    }

    #[test]
    fn unbalanced_asterisks_italicize_greedily() {
        assert_eq!(render("*a *b* c"), "<em>a </em>b* c");
        assert_eq!(render("2 * 3 * 4"), "2 <em> 3 </em> 4");
    }

    #[test]
    fn user_text_cannot_forge_code_shield() {
        let out = render("\u{E000}0\u{E001} ```x```");
        assert_eq!(out, "&#xE000;0&#xE001; <pre><code>x</code></pre>");
    }

    #[test]
    fn plain_text_is_a_fixed_point() {
        for plain in [
            "hello there friend",
            "42",
            "it costs 3.50, right? yes!",
            "Senko-san's tail: fluffy; ears: soft",
            "こんにちは 狐 ünïcödé ✨",
            "one two three four five six seven eight nine ten",
        ] {
            assert_eq!(render(plain), plain);
            assert_eq!(render(&render(plain)), render(plain));
        }
    }

    #[test]
    fn crlf_lines_are_line_anchored() {
        assert_eq!(render("a\r\n---\r\nb"), "a\r<br><hr>\r<br>b");
        assert_eq!(render("# Title\r\nbody"), "<h1>Title</h1>\r<br>body");
        assert_eq!(render("*a\r*"), "*a\r*");
    }

    #[test]
    fn crlf_list_lines_stay_plain() {
        assert_eq!(render("- one\r\n- two\r\n"), "- one\r<br>- two\r<br>");
    }

    #[test]
    fn numbered_lists_need_ascii_digits() {
        assert_eq!(render("\u{661}. one\n\u{662}. two\n"), "\u{661}. one<br>\u{662}. two<br>");
        assert_eq!(render("1. one\n2. two\n"), "<ol><li>one</li><li>two</li></ol>");
    }

    #[test]
    fn normalize_strips_tags_and_trims() {
        assert_eq!(normalize("  <em>hi</em> there \n"), "hi there");
    }

    #[test]
    fn visible_text_restores_escapes() {
        assert_eq!(visible_text(&render("a < b **c**")), "a < b c");
    }
}
