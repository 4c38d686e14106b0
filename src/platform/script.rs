//! Player script analysis
//!
//! Recovers the signature and "n" scramble programs from the obfuscated player
//! script. Candidate regions are cut out with balanced-brace scanning and then
//! classified by their token shape. Regular expressions are only used for the
//! fixed anchors (timestamp marker and the "n" lookup heuristics).

use crate::platform::cipher::{DecipherAction, DecipherProgram};
use crate::platform::lexer::{
    extract_balanced, is_ident_char, is_ident_start, split_top_level, tokenize, Token, TokenKind,
};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

const STS_PATTERN: &str = r"(?:signatureTimestamp|sts):(\d{5})";
const N_GET_PATTERN: &str = r#"(?s)\.get\("n"\)[^;\)]{0,200}?([a-zA-Z0-9$]{2})\("#;
const N_ASSIGN_PATTERN: &str = r#"a\.get\("n"\)\)\s*&&\s*\(b=([a-zA-Z0-9$]{2})\("#;

/// Helper method kinds, recognized by body shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HelperKind {
    Swap,
    Slice,
    Reverse,
}

/// A function head located in the source
#[derive(Debug, Clone)]
struct FunctionHead<'a> {
    name: &'a str,
    params: Vec<&'a str>,
    /// Byte offset of the opening body brace
    open: usize,
}

/// A function with its body region (braces included)
#[derive(Debug, Clone)]
struct FunctionDef<'a> {
    name: &'a str,
    body: &'a str,
}

/// `Obj.method(x, N)` found inside a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HelperCall<'a> {
    object: &'a str,
    method: &'a str,
    arg: Option<usize>,
}

/// Programs derived from one player script
#[derive(Debug, Clone, Default)]
pub struct ScriptPrograms {
    pub signature: Option<DecipherProgram>,
    pub n_transform: Option<DecipherProgram>,
}

/// Structural analyzer over one player script
pub struct ScriptAnalyzer<'a> {
    source: &'a str,
}

impl<'a> ScriptAnalyzer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// The five-digit signature timestamp embedded in the script
    pub fn signature_timestamp(&self) -> Option<u32> {
        let re = Regex::new(STS_PATTERN).ok()?;
        re.captures(self.source)?.get(1)?.as_str().parse().ok()
    }

    /// Derive both scramble programs.
    ///
    /// The signature call site is located once and reused to rule it out of
    /// the "n" fallback search.
    pub fn extract_programs(&self) -> ScriptPrograms {
        let call_site = self.signature_function();
        let signature = call_site
            .as_ref()
            .and_then(|f| self.signature_program_from(f));
        let n_transform = self
            .find_n_function_name(call_site.as_ref().map(|f| f.name))
            .and_then(|name| self.extract_n_param_program(&name));

        ScriptPrograms {
            signature,
            n_transform,
        }
    }

    /// Signature program for `call_site`.
    ///
    /// Returns `None` unless every stage matches and at least one action is
    /// recognized.
    fn signature_program_from(&self, call_site: &FunctionDef<'a>) -> Option<DecipherProgram> {
        if self.signature_timestamp().is_none() {
            debug!("Signature timestamp marker not found");
            return None;
        }

        debug!("Found signature function: {}", call_site.name);
        self.program_from(call_site)
    }

    /// Extract the "n" scramble program from the function called `name`
    pub fn extract_n_param_program(&self, name: &str) -> Option<DecipherProgram> {
        let function = find_function_by_name(self.source, name)?;
        self.program_from(&function)
    }

    /// Locate the name of the "n" transform function
    fn find_n_function_name(&self, signature_name: Option<&str>) -> Option<String> {
        for pattern in [N_GET_PATTERN, N_ASSIGN_PATTERN] {
            let Ok(re) = Regex::new(pattern) else {
                continue;
            };
            if let Some(name) = re.captures(self.source).and_then(|c| c.get(1)) {
                debug!("Found n function name via anchor: {}", name.as_str());
                return Some(name.as_str().to_string());
            }
        }

        // Any other split/join function besides the signature one
        split_join_functions(self.source)
            .find(|f| Some(f.name) != signature_name)
            .map(|f| {
                debug!("Using split/join function as n transform: {}", f.name);
                f.name.to_string()
            })
    }

    /// First split/join-shaped function that calls into a helper object
    fn signature_function(&self) -> Option<FunctionDef<'a>> {
        split_join_functions(self.source).find(|f| container_name(f).is_some())
    }

    fn program_from(&self, function: &FunctionDef<'a>) -> Option<DecipherProgram> {
        let container = container_name(function)?;
        let object = find_object_literal(self.source, container)?;
        debug!("Found helper object: {}", container);

        let helpers = classify_helpers(object);
        if helpers.is_empty() {
            debug!("No helper methods recognized in {}", container);
            return None;
        }

        let tokens = tokenize(function.body);
        let inner = inner_tokens(&tokens);
        let mut actions = Vec::new();

        for statement in split_top_level(inner, ";") {
            for call in helper_calls(statement) {
                if call.object != container {
                    continue;
                }
                let Some(kind) = helpers.get(call.method) else {
                    continue;
                };
                let arg = call.arg.unwrap_or(0);
                actions.push(match kind {
                    HelperKind::Reverse => DecipherAction::Reverse,
                    HelperKind::Slice => DecipherAction::Slice(arg),
                    HelperKind::Swap => DecipherAction::Swap(arg),
                });
            }
        }

        if actions.is_empty() {
            return None;
        }

        let program = DecipherProgram::new(actions);
        debug!("Extracted program {} from {}", program, function.name);
        Some(program)
    }
}

fn skip_ws(src: &str, pos: usize) -> usize {
    src[pos..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(src.len(), |(i, _)| pos + i)
}

fn take_ident(src: &str, pos: usize) -> Option<&str> {
    if !src[pos..].chars().next().is_some_and(is_ident_start) {
        return None;
    }
    let end = src[pos..]
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map_or(src.len(), |(i, _)| pos + i);
    Some(&src[pos..end])
}

/// Identifier immediately preceding `end` (after trimming whitespace)
fn ident_before(src: &str, end: usize) -> Option<&str> {
    let trimmed = src[..end].trim_end();
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let name = &trimmed[start..];
    name.chars().next().filter(|c| is_ident_start(*c))?;
    Some(name)
}

/// Parse the function whose `function` keyword starts at byte `kw`.
///
/// Handles `name=function(params){` and `function name(params){`.
fn parse_function(src: &str, kw: usize) -> Option<FunctionHead<'_>> {
    const KEYWORD: &str = "function";
    if src[..kw].chars().next_back().is_some_and(is_ident_char) {
        return None;
    }

    let mut pos = kw + KEYWORD.len();
    if src[pos..].chars().next().is_some_and(is_ident_char) {
        return None;
    }
    pos = skip_ws(src, pos);

    let name = match take_ident(src, pos) {
        Some(declared) => {
            pos = skip_ws(src, pos + declared.len());
            declared
        }
        None => {
            let before = src[..kw].trim_end();
            let eq = before.strip_suffix('=')?;
            if eq.ends_with(['=', '!', '<', '>']) {
                return None;
            }
            ident_before(src, eq.len())?
        }
    };

    if src.as_bytes().get(pos) != Some(&b'(') {
        return None;
    }
    let close = pos + src[pos..].find(')')?;
    let params: Vec<&str> = src[pos + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if !params
        .iter()
        .all(|p| p.chars().next().is_some_and(is_ident_start) && p.chars().all(is_ident_char))
    {
        return None;
    }

    let open = skip_ws(src, close + 1);
    if src.as_bytes().get(open) != Some(&b'{') {
        return None;
    }

    Some(FunctionHead { name, params, open })
}

fn find_function_by_name<'a>(src: &'a str, name: &str) -> Option<FunctionDef<'a>> {
    src.match_indices("function")
        .filter_map(|(kw, _)| parse_function(src, kw))
        .find(|head| head.name == name)
        .and_then(|head| {
            Some(FunctionDef {
                name: head.name,
                body: extract_balanced(src, head.open)?,
            })
        })
}

/// A slice of at most `max` bytes starting at `start`, cut on a char boundary
fn prefix(src: &str, start: usize, max: usize) -> &str {
    let mut end = (start + max).min(src.len());
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    &src[start..end]
}

fn is_empty_string(tok: Option<&Token<'_>>) -> bool {
    tok.and_then(|t| t.str_value()) == Some("")
}

/// `p=p.split("")` at the start of a body
fn starts_with_split(tokens: &[Token<'_>], param: &str) -> bool {
    tokens.len() >= 8
        && tokens[0].is_ident(param)
        && tokens[1].is_punct("=")
        && tokens[2].is_ident(param)
        && tokens[3].is_punct(".")
        && tokens[4].is_ident("split")
        && tokens[5].is_punct("(")
        && is_empty_string(tokens.get(6))
        && tokens[7].is_punct(")")
}

/// `return p.join("")` at the end of a body (braces included)
fn ends_with_join(tokens: &[Token<'_>], param: &str) -> bool {
    let mut end = tokens.len();
    if end == 0 || !tokens[end - 1].is_punct("}") {
        return false;
    }
    end -= 1;
    if end > 0 && tokens[end - 1].is_punct(";") {
        end -= 1;
    }
    if end < 7 {
        return false;
    }
    let tail = &tokens[end - 7..end];
    tail[0].is_ident("return")
        && tail[1].is_ident(param)
        && tail[2].is_punct(".")
        && tail[3].is_ident("join")
        && tail[4].is_punct("(")
        && is_empty_string(tail.get(5))
        && tail[6].is_punct(")")
}

/// Every `X=function(a){a=a.split("");...;return a.join("")}` in the source
fn split_join_functions(src: &str) -> impl Iterator<Item = FunctionDef<'_>> + '_ {
    src.match_indices("function").filter_map(move |(kw, _)| {
        let head = parse_function(src, kw)?;
        let [param] = head.params.as_slice() else {
            return None;
        };

        // Cheap shape check before cutting out the whole body
        let lead = tokenize(prefix(src, head.open + 1, 64));
        if !starts_with_split(&lead, param) {
            return None;
        }

        let body = extract_balanced(src, head.open)?;
        if !ends_with_join(&tokenize(body), param) {
            return None;
        }

        Some(FunctionDef {
            name: head.name,
            body,
        })
    })
}

fn inner_tokens<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    if tokens.len() >= 2 {
        &tokens[1..tokens.len() - 1]
    } else {
        &[]
    }
}

/// All `Obj.method(x)` / `Obj.method(x,N)` calls in a statement, in order
fn helper_calls<'a>(statement: &[Token<'a>]) -> Vec<HelperCall<'a>> {
    let mut calls = Vec::new();
    let mut i = 0;

    while i + 6 <= statement.len() {
        let t = &statement[i..];
        let head = t[0].kind == TokenKind::Ident
            && t[1].is_punct(".")
            && t[2].kind == TokenKind::Ident
            && t[3].is_punct("(")
            && t[4].kind == TokenKind::Ident;

        if head {
            if t[5].is_punct(")") {
                calls.push(HelperCall {
                    object: t[0].text,
                    method: t[2].text,
                    arg: None,
                });
                i += 6;
                continue;
            }
            if t.len() >= 8 && t[5].is_punct(",") && t[7].is_punct(")") {
                if let Some(arg) = t[6].as_number() {
                    calls.push(HelperCall {
                        object: t[0].text,
                        method: t[2].text,
                        arg: Some(arg),
                    });
                    i += 8;
                    continue;
                }
            }
        }
        i += 1;
    }

    calls
}

/// Helper object referenced by the first `Obj.method(x,N)` call in a body
fn container_name<'a>(function: &FunctionDef<'a>) -> Option<&'a str> {
    let tokens = tokenize(function.body);
    split_top_level(inner_tokens(&tokens), ";")
        .into_iter()
        .flat_map(helper_calls)
        .find(|call| call.arg.is_some())
        .map(|call| call.object)
}

/// Locate `var name={...}` and return the object literal region
fn find_object_literal<'a>(src: &'a str, name: &str) -> Option<&'a str> {
    for (pos, _) in src.match_indices(name) {
        let after = pos + name.len();
        if src[after..].chars().next().is_some_and(is_ident_char) {
            continue;
        }

        let before = &src[..pos];
        if !before.chars().next_back().is_some_and(char::is_whitespace) {
            continue;
        }
        let decl = before.trim_end();
        let Some(keyword) = ["var", "let", "const"]
            .into_iter()
            .find(|kw| decl.ends_with(*kw))
        else {
            continue;
        };
        if decl[..decl.len() - keyword.len()]
            .chars()
            .next_back()
            .is_some_and(is_ident_char)
        {
            continue;
        }

        let eq = skip_ws(src, after);
        if src.as_bytes().get(eq) != Some(&b'=') {
            continue;
        }
        let open = skip_ws(src, eq + 1);
        if let Some(object) = extract_balanced(src, open) {
            return Some(object);
        }
    }

    None
}

/// Map each `name:function(..){..}` member of an object literal to its kind
fn classify_helpers(object: &str) -> HashMap<&str, HelperKind> {
    let tokens = tokenize(object);
    let mut helpers = HashMap::new();

    for member in split_top_level(inner_tokens(&tokens), ",") {
        let is_method = member.len() > 3
            && member[0].kind == TokenKind::Ident
            && member[1].is_punct(":")
            && member[2].is_ident("function");
        if !is_method {
            continue;
        }

        let body = &member[3..];
        let kind = if body.iter().any(|t| t.is_punct("%")) {
            HelperKind::Swap
        } else if body.iter().any(|t| t.is_ident("splice")) {
            HelperKind::Slice
        } else if body.iter().any(|t| t.is_ident("reverse")) {
            HelperKind::Reverse
        } else {
            continue;
        };
        helpers.insert(member[0].text, kind);
    }

    helpers
}

#[cfg(test)]
mod tests {
    use super::*;
    use DecipherAction::*;

    const HELPERS: &str = r#"var Xy={ab:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
cd:function(a){a.reverse()},
ef:function(a,b){a.splice(0,b)}};"#;

    const SIGNATURE_FN: &str =
        r#"Kq=function(a){a=a.split("");Xy.cd(a,7);Xy.ef(a,2);Xy.ab(a,3);return a.join("")};"#;

    const N_HELPERS: &str =
        r#"var Zp={Qa:function(a){a.reverse()},Rb:function(a,b){a.splice(0,b)}};"#;

    const N_FN: &str =
        r#"Nf=function(a){a=a.split("");Zp.Rb(a,1);Zp.Qa(a,0);return a.join("")};"#;

    fn player_script(extra: &str) -> String {
        format!(
            "(function(g){{var window=this;{}\nvar cfg={{signatureTimestamp:19834}};\n{}\n{}\n{}\n{}}})(_yt_player);",
            HELPERS, SIGNATURE_FN, N_HELPERS, N_FN, extra
        )
    }

    #[test]
    fn test_signature_timestamp() {
        let js = player_script("");
        assert_eq!(ScriptAnalyzer::new(&js).signature_timestamp(), Some(19834));
        assert_eq!(ScriptAnalyzer::new("var a=1;").signature_timestamp(), None);
        assert_eq!(
            ScriptAnalyzer::new("x={sts:20111}").signature_timestamp(),
            Some(20111)
        );
    }

    #[test]
    fn test_extract_signature_program() {
        let js = player_script("");
        let program = ScriptAnalyzer::new(&js).extract_programs().signature.unwrap();
        assert_eq!(program.actions(), &[Reverse, Slice(2), Swap(3)]);
        assert_eq!(program.apply("abcdef"), "acbd");
    }

    #[test]
    fn test_signature_requires_timestamp() {
        let js = format!("{}\n{}", HELPERS, SIGNATURE_FN);
        assert!(ScriptAnalyzer::new(&js).extract_programs().signature.is_none());
    }

    #[test]
    fn test_signature_missing_helper_object() {
        let js = format!("var c={{sts:12345}};{}", SIGNATURE_FN);
        assert!(ScriptAnalyzer::new(&js).extract_programs().signature.is_none());
    }

    #[test]
    fn test_signature_unrecognized_helpers() {
        let js = format!(
            "var c={{sts:12345}};var Xy={{ab:function(a,b){{a.push(b)}}}};{}",
            SIGNATURE_FN
        );
        assert!(ScriptAnalyzer::new(&js).extract_programs().signature.is_none());
    }

    #[test]
    fn test_signature_with_whitespace_and_function_declaration() {
        let js = r#"var c={signatureTimestamp:20000};
var Ab = {
  rv: function(a) { a.reverse() },
  sw: function(a, b) { var c = a[0]; a[0] = a[b % a.length]; a[b % a.length] = c }
};
function Df(a) { a = a.split(''); Ab.sw(a, 1); Ab.rv(a, 0); return a.join('') }"#;
        let program = ScriptAnalyzer::new(js).extract_programs().signature.unwrap();
        assert_eq!(program.actions(), &[Swap(1), Reverse]);
    }

    #[test]
    fn test_find_n_function_name_get_anchor() {
        let js = player_script(r#"var b=a.get("n"),c=Nf(b);"#);
        assert_eq!(
            ScriptAnalyzer::new(&js).find_n_function_name(Some("Kq")).as_deref(),
            Some("Nf")
        );
    }

    #[test]
    fn test_find_n_function_name_assign_anchor() {
        let js = player_script(r#"(b=a.get("n"))&&(b=Nf(b),c.set("n",b));"#);
        assert_eq!(
            ScriptAnalyzer::new(&js).find_n_function_name(Some("Kq")).as_deref(),
            Some("Nf")
        );
    }

    #[test]
    fn test_find_n_function_name_split_join_fallback() {
        let js = player_script("");
        assert_eq!(
            ScriptAnalyzer::new(&js).find_n_function_name(Some("Kq")).as_deref(),
            Some("Nf")
        );
    }

    #[test]
    fn test_find_n_function_name_exhausted() {
        let js = format!("var c={{sts:12345}};{}\n{}", HELPERS, SIGNATURE_FN);
        assert!(ScriptAnalyzer::new(&js).find_n_function_name(Some("Kq")).is_none());
    }

    #[test]
    fn test_n_fallback_skips_only_the_named_signature_function() {
        let js = player_script("");
        let analyzer = ScriptAnalyzer::new(&js);
        assert_eq!(analyzer.find_n_function_name(None).as_deref(), Some("Kq"));
        assert_eq!(analyzer.find_n_function_name(Some("Kq")).as_deref(), Some("Nf"));
    }

    #[test]
    fn test_extract_programs() {
        let js = player_script("");
        let programs = ScriptAnalyzer::new(&js).extract_programs();
        assert_eq!(
            programs.signature.unwrap().actions(),
            &[Reverse, Slice(2), Swap(3)]
        );
        assert_eq!(programs.n_transform.unwrap().actions(), &[Slice(1), Reverse]);
    }

    #[test]
    fn test_extract_n_param_program() {
        let js = player_script("");
        let analyzer = ScriptAnalyzer::new(&js);
        let program = analyzer.extract_n_param_program("Nf").unwrap();
        assert_eq!(program.actions(), &[Slice(1), Reverse]);
        assert_eq!(program.apply("xyz123"), "321zy");
        assert!(analyzer.extract_n_param_program("Qq").is_none());
    }

    #[test]
    fn test_parse_function_forms() {
        let src = "Kq=function(a,b){}";
        let head = parse_function(src, 3).unwrap();
        assert_eq!(head.name, "Kq");
        assert_eq!(head.params, vec!["a", "b"]);

        let src = "function Df(a){}";
        let head = parse_function(src, 0).unwrap();
        assert_eq!(head.name, "Df");

        assert!(parse_function("x==function(a){}", 3).is_none());
        assert!(parse_function("myfunction(a){}", 2).is_none());
    }

    #[test]
    fn test_helper_calls() {
        let toks = tokenize("Xy.ab(a,3)");
        assert_eq!(
            helper_calls(&toks),
            vec![HelperCall {
                object: "Xy",
                method: "ab",
                arg: Some(3)
            }]
        );
        let toks = tokenize(r#"a=a.split("")"#);
        assert!(helper_calls(&toks).is_empty());
    }

    #[test]
    fn test_find_object_literal_requires_declaration() {
        let src = "Xy.ab(a);var Xy={ab:1};";
        assert_eq!(find_object_literal(src, "Xy"), Some("{ab:1}"));
        assert_eq!(find_object_literal("AXy={a:1}", "Xy"), None);
    }
}
