//! Character escaping tables for both backends.

use once_cell::sync::Lazy;
use regex::Regex;

/// Runs that `\texttt` would otherwise mangle: reserved characters, space
/// runs, sentence stops, quotes and ligature digraphs.
static VERBATIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<reserved>[#%$&^~{}_\\]+|  +)",
        r"|(?P<stop>[!?.:;] )",
        r"|(?P<quote>['`])",
        r"|(?P<ligature>--|,,|<<|>>)",
    ))
    .unwrap()
});

/// LaTeX replacement for one character, if it needs one.
pub fn latex_char(ch: char) -> Option<&'static str> {
    let replacement = match ch {
        '#' => r"\#",
        '$' => r"\$",
        '%' => r"\%",
        '&' => r"\&",
        '~' => r"\char`\~{}",
        '^' => r"\char`\^{}",
        '_' => r"\_",
        '{' => r"\{",
        '}' => r"\}",
        '\\' => r"\char`\\{}",
        '-' => "{-}",
        '<' => "{<}",
        '>' => "{>}",
        ',' => "{,}",
        '\'' => r"\textquotesingle{}",
        '`' => r"\char0{}",
        ' ' => "{ }",
        _ => return None,
    };
    Some(replacement)
}

fn push_latex_char(out: &mut String, ch: char) {
    match latex_char(ch) {
        Some(replacement) => out.push_str(replacement),
        None => out.push(ch),
    }
}

/// Escapes running text. Inside `\texttt` quotes are escaped as well, since
/// typewriter fonts would otherwise curl them.
pub fn escape_latex(text: &str, monospace: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&latex_escaped(escaped, monospace)),
                None => out.push('\\'),
            },
            '#' | '$' | '%' | '^' | '{' | '}' | '_' | '~' => push_latex_char(&mut out, ch),
            '\'' | '`' if monospace => push_latex_char(&mut out, ch),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders a backslash-escaped character.
pub fn latex_escaped(ch: char, monospace: bool) -> String {
    if monospace && ch == ' ' {
        return r"\char32{}".to_string();
    }
    latex_char(ch).map_or_else(|| ch.to_string(), str::to_string)
}

/// Imitates `\verb` for use inside `\texttt{...}`, which unlike `\verb`
/// survives in moving arguments.
pub fn verbatim_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for caps in VERBATIM.captures_iter(text) {
        let Some(found) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[pos..found.start()]);
        let run = found.as_str();
        if caps.name("reserved").is_some() || caps.name("quote").is_some() {
            run.chars().for_each(|ch| push_latex_char(&mut out, ch));
        } else if caps.name("ligature").is_some() {
            let mut chars = run.chars();
            if let (Some(first), Some(second)) = (chars.next(), chars.next()) {
                out.push(first);
                out.push('{');
                out.push(second);
                out.push('}');
            }
        } else if let Some(stop) = run.chars().next() {
            out.push(stop);
            out.push_str(r"\ ");
        }
        pos = found.end();
    }
    out.push_str(&text[pos..]);
    out
}

/// Escapes `#`, `%`, `{` and `}` in a hyperlink target.
pub fn escape_latex_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        if matches!(ch, '#' | '%' | '{' | '}') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A backslash-escaped character: markup-significant ones become entities,
/// everything else a numeric character reference.
pub fn html_escaped(ch: char) -> String {
    if matches!(ch, '&' | '\'' | '"' | '<' | '>') {
        escape_html(ch.encode_utf8(&mut [0; 4]))
    } else {
        format!("&#{};", u32::from(ch))
    }
}

/// Percent-encodes bytes that cannot appear raw in an `href` and escapes
/// the result for a double-quoted attribute. Existing `%XX` escapes are
/// kept; any other `%` is encoded.
pub fn escape_url_attr(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut encoded = String::with_capacity(url.len());
    for (idx, &byte) in bytes.iter().enumerate() {
        let keep = match byte {
            b'%' => bytes
                .get(idx + 1..idx + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)),
            b'"' | b'<' | b'>' | b'\\' | b'^' | b'`' | b'{' | b'|' | b'}' => false,
            0x21..=0x7E => true,
            _ => false,
        };
        if keep {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    escape_html(&encoded)
}

/// `<` and `>` inside math would open tags; MathJax reads `\lt`/`\gt`.
pub fn html_math(math: &str) -> String {
    let mut out = String::with_capacity(math.len());
    let mut chars = math.chars().peekable();
    while let Some(ch) = chars.next() {
        let command = match ch {
            '<' => r"\lt",
            '>' => r"\gt",
            _ => {
                out.push(ch);
                continue;
            }
        };
        out.push_str(command);
        if chars
            .peek()
            .is_some_and(|next| next.is_alphanumeric() || *next == '_')
        {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("50% of #1", false, r"50\% of \#1")]
    #[case("a_b {c}", false, r"a\_b \{c\}")]
    #[case("x^2~y", false, r"x\char`\^{}2\char`\~{}y")]
    #[case("it's", false, "it's")]
    #[case("it's", true, r"it\textquotesingle{}s")]
    #[case(r"\#", false, r"\#")]
    #[case(r"a\ b", true, r"a\char32{}b")]
    fn latex_text(#[case] input: &str, #[case] monospace: bool, #[case] expected: &str) {
        assert_eq!(escape_latex(input, monospace), expected);
    }

    #[test]
    fn verbatim_breaks_ligatures_and_stops() {
        assert_eq!(verbatim_latex("a--b"), "a-{-}b");
        assert_eq!(verbatim_latex("end. Next"), r"end.\ Next");
        assert_eq!(verbatim_latex("a  b"), "a{ }{ }b");
        assert_eq!(verbatim_latex(r"\x_1"), r"\char`\\{}x\_1");
        assert_eq!(verbatim_latex("'q'"), r"\textquotesingle{}q\textquotesingle{}");
    }

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
        assert_eq!(html_escaped('*'), "&#42;");
        assert_eq!(html_escaped('<'), "&lt;");
    }

    #[test]
    fn url_attributes_are_percent_encoded() {
        assert_eq!(escape_url_attr("a b\\c\"é"), "a%20b%5Cc%22%C3%A9");
        assert_eq!(escape_url_attr("x.org/?q=a%20b&p=100%"), "x.org/?q=a%20b&amp;p=100%25");
        assert_eq!(escape_url_attr("{x}|%zz"), "%7Bx%7D%7C%25zz");
        assert_eq!(escape_latex_url("x.org/#a%20"), r"x.org/\#a\%20");
    }

    #[test]
    fn math_comparisons_use_commands() {
        assert_eq!(html_math("a<b"), r"a\lt b");
        assert_eq!(html_math("a < b"), r"a \lt b");
        assert_eq!(html_math("x>"), r"x\gt");
    }
}
