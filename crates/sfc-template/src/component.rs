//! Single-file component parsing.
//!
//! A component is split into its top-level blocks: the first `<script>`,
//! the first `<template>` and every `<style>`. The script is parsed as a
//! whole program positioned in the component source; the template goes
//! through [`transform`](crate::transform()).

use serde::Serialize;
use sfc_lexer::{blank_out, Comment, LineIndex, Range, Token, TokenKind};
use sfc_parser::{MarkupElement, MarkupNode, MarkupParser, ParseError, ParseScript, Program, Script};
use tracing::debug;

use crate::node::TemplateBody;
use crate::options::{OptionsError, ParserOptions, TemplateOptions};
use crate::transform::transform;

#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("invalid script: {0}")]
    Script(ParseError),
    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// The top-level blocks of a component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentBlocks {
    pub script: Option<MarkupElement>,
    pub template: Option<MarkupElement>,
    pub styles: Vec<MarkupElement>,
}

/// A parsed component: the script program and its tokens, plus the
/// transformed template when there is one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub program: Program,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub template_body: Option<TemplateBody>,
}

/// Find the blocks of a component. Later `<script>` and `<template>` blocks
/// are ignored.
pub fn split_component(source: &str) -> ComponentBlocks {
    let MarkupNode::Fragment(nodes) = MarkupParser::parse_fragment(source) else {
        return ComponentBlocks::default();
    };

    let mut blocks = ComponentBlocks::default();
    for element in nodes.into_iter().filter_map(|node| match node {
        MarkupNode::Element(element) => Some(element),
        _ => None,
    }) {
        if element.is("script") {
            if blocks.script.is_none() {
                blocks.script = Some(element);
            }
        } else if element.is("template") {
            if blocks.template.is_none() {
                blocks.template = Some(element);
            }
        } else if element.is("style") {
            blocks.styles.push(element);
        }
    }

    debug!(
        script = blocks.script.is_some(),
        template = blocks.template.is_some(),
        styles = blocks.styles.len(),
        "component split"
    );
    blocks
}

/// Parse a component.
///
/// When `options` names a file that is not a component, the whole source is
/// parsed as a script and there is no template body.
pub fn parse_component(
    source: &str,
    options: &ParserOptions,
    parser: &impl ParseScript,
) -> Result<Component, ComponentError> {
    if !options.is_component() {
        let Script {
            program,
            tokens,
            comments,
        } = parser.parse_script(source).map_err(ComponentError::Script)?;
        return Ok(Component {
            program,
            tokens,
            comments,
            template_body: None,
        });
    }

    let blocks = split_component(source);
    let Script {
        mut program,
        mut tokens,
        comments,
    } = parse_script_block(source, blocks.script.as_ref(), parser)?;

    if let Some(script) = &blocks.script {
        let lines = LineIndex::new(source);
        let start = script.start_tag.end;
        program.range = Range::new(start, program.range.end.max(start));
        program.loc = lines.location(program.range);

        tokens.insert(0, Token::from_span(TokenKind::Punctuator, script.start_tag, source));
        if let Some(end_tag) = script.end_tag {
            tokens.push(Token::from_span(TokenKind::Punctuator, end_tag, source));
        }
    }

    let template_body = match &blocks.template {
        Some(template) => parse_template_block(source, template, parser, &options.template)?,
        None => None,
    };

    Ok(Component {
        program,
        tokens,
        comments,
        template_body,
    })
}

/// Parse a template snippet on its own.
pub fn parse_template(
    source: &str,
    parser: &impl ParseScript,
    options: &TemplateOptions,
) -> Result<TemplateBody, ComponentError> {
    let nodes = match MarkupParser::parse_fragment(source) {
        MarkupNode::Fragment(nodes) => nodes,
        _ => Vec::new(),
    };
    Ok(transform(&nodes, source, parser, options)?)
}

/// Script text padded so that the parser reports positions in `source`.
fn script_code(source: &str, script: Option<&MarkupElement>) -> String {
    let text = script.and_then(|s| s.children.first()).and_then(|node| match node {
        MarkupNode::Text { span, .. } => Some(span.range()),
        _ => None,
    });
    match text {
        Some(range) => {
            let mut code = blank_out(&source[..range.start]);
            code.push_str(range.slice(source));
            code
        }
        None => String::new(),
    }
}

fn parse_script_block(
    source: &str,
    script: Option<&MarkupElement>,
    parser: &impl ParseScript,
) -> Result<Script, ComponentError> {
    let code = script_code(source, script);
    parser.parse_script(&code).map_err(ComponentError::Script)
}

fn parse_template_block(
    source: &str,
    template: &MarkupElement,
    parser: &impl ParseScript,
    options: &TemplateOptions,
) -> Result<Option<TemplateBody>, ComponentError> {
    let lang = template.attr("lang").and_then(|a| a.value.as_deref());
    match lang {
        None | Some("") | Some("html") => {
            let nodes = [MarkupNode::Element(template.clone())];
            Ok(Some(transform(&nodes, source, parser, options)?))
        }
        Some(lang) => {
            debug!(lang, "skipping template in unsupported language");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfc_lexer::Position;
    use sfc_parser::{ScriptParser, StmtKind};

    const COMPONENT: &str = "<template>\n  <p>{{ msg }}</p>\n</template>\n\
                             <script>\nexport default { msg }\n</script>\n\
                             <style>p { color: red }</style>\n";

    fn parse(source: &str) -> Component {
        parse_component(source, &ParserOptions::default(), &ScriptParser).unwrap()
    }

    #[test]
    fn test_split_component() {
        let blocks = split_component(
            "<script>a</script><template></template><script>b</script>\
             <style></style><style></style>",
        );
        assert_eq!(blocks.script.map(|s| s.span.start), Some(0));
        assert!(blocks.template.is_some());
        assert_eq!(blocks.styles.len(), 2);
    }

    #[test]
    fn test_script_is_positioned_in_component() {
        let component = parse(COMPONENT);
        let script_start = COMPONENT.find("<script>").unwrap();

        let raws: Vec<&str> = component.tokens.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, vec!["<script>", "export", "default", "{", "msg", "}", "</script>"]);
        for token in &component.tokens {
            assert_eq!(token.range.slice(COMPONENT), token.raw);
        }

        assert_eq!(component.program.range.start, script_start + "<script>".len());
        assert_eq!(component.tokens[1].loc.start, Position::new(5, 0));
        assert!(matches!(component.program.body[0].kind, StmtKind::ExportDefault(_)));
    }

    #[test]
    fn test_template_body_is_attached() {
        let component = parse(COMPONENT);
        let body = component.template_body.unwrap();
        assert_eq!(body.root().children().len(), 1);
        assert!(body.syntax_errors().is_empty());
        assert!(body.tokens.iter().any(|t| t.raw == "msg"));
    }

    #[test]
    fn test_template_in_other_language_is_skipped() {
        let component = parse("<template lang=\"pug\">p hi</template>");
        assert_eq!(component.template_body, None);
    }

    #[test]
    fn test_missing_script_gives_empty_program() {
        let component = parse("<template><p></p></template>");
        assert!(component.program.body.is_empty());
        assert!(component.tokens.is_empty());
        assert!(component.template_body.is_some());
    }

    #[test]
    fn test_plain_script_file() {
        let options = ParserOptions::default().with_file_path("main.js");
        let component = parse_component("let a = 1", &options, &ScriptParser).unwrap();
        assert_eq!(component.tokens.len(), 4);
        assert_eq!(component.template_body, None);
    }

    #[test]
    fn test_script_error_reports_component_position() {
        let result = parse_component(
            "<template></template>\n<script>\nconst x;\n</script>",
            &ParserOptions::default(),
            &ScriptParser,
        );
        match result {
            Err(ComponentError::Script(err)) => assert_eq!(err.line, 3),
            other => panic!("expected script error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_options_are_reported() {
        let mut options = ParserOptions::default();
        options.template.directive_prefix = String::new();
        let result = parse_component("<template></template>", &options, &ScriptParser);
        assert!(matches!(result, Err(ComponentError::Options(OptionsError::EmptyPrefix))));
    }

    #[test]
    fn test_cut_off_markup_is_not_an_error() {
        let component = parse("<template><p :a=\"b\"></p></template>\n<div class=\"x");
        assert!(component.template_body.is_some());

        let body = parse_template("<p>{{ a }}</p><b", &ScriptParser, &TemplateOptions::default()).unwrap();
        let raws: Vec<&str> = body.tokens.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, vec!["<", "p", ">", "{{", "a", "}}", "</", "p", ">", "<b"]);
    }

    #[test]
    fn test_parse_template_snippet() {
        let body = parse_template("<b>{{ x }}</b>", &ScriptParser, &TemplateOptions::default()).unwrap();
        assert_eq!(body.tokens.len(), 9);
    }
}
