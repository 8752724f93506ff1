/// Dialogue script compiler: line-oriented source to a typed node graph.
///
/// A script is a header (optional `TRIGGER` and top-level `REQUIRE` lines)
/// followed by one or more `NODE` blocks:
///
/// ```text
/// TRIGGER gate
/// REQUIRE notFlag paid_toll
///
/// NODE start
/// GUARD: "Halt: the toll is five gold."   # quoted because of the colon
/// CHOICE pay Pay the toll
///   REQUIRE variableGreaterThan gold 4
///   ADD variable gold -5
///   GOTO after
/// CHOICE leave @choice.leave
///   GOTO location square
///
/// NODE after
/// GUARD: You may pass.
/// ```
///
/// Compilation is all-or-nothing: the first line that fails to match a
/// production aborts with a `ScriptError` naming it.
use thiserror::Error;

use crate::schema::condition::Condition;
use crate::schema::dialogue::{Branch, Choice, Dialogue, Node, Text};
use crate::schema::effect::Effect;
use crate::schema::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("line {line}: {message}: `{source_line}`")]
    Syntax {
        line: usize,
        message: String,
        source_line: String,
    },
    #[error("script contains no NODE")]
    NoNodes,
}

impl ScriptError {
    /// The 1-based source line of a syntax error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. } => Some(*line),
            Self::NoNodes => None,
        }
    }
}

const EFFECT_KEYWORDS: &[&str] = &[
    "SET", "CLEAR", "ADD", "REMOVE", "MOVE", "ADVANCE", "UNLOCK", "START", "ENABLE", "DISABLE",
    "PLAY", "NOTIFY", "ROLL",
];

const STRUCTURE_KEYWORDS: &[&str] = &[
    "NODE", "CHOICE", "IF", "END", "GOTO", "TRIGGER", "REQUIRE", "VOICE", "PORTRAIT",
];

/// Compile one dialogue script.
pub fn parse_dialogue(id: &str, source: &str) -> Result<Dialogue, ScriptError> {
    Parser::new(source).parse(id)
}

/// A comment-stripped, non-blank source line.
#[derive(Debug, Clone)]
struct SourceLine {
    number: usize,
    text: String,
}

/// How a line starts.
enum LineKind<'a> {
    Keyword(&'a str, &'a str),
    Speaker(&'a str, &'a str),
    Unknown,
}

impl SourceLine {
    fn kind(&self) -> LineKind<'_> {
        let text = self.text.as_str();
        let (first, rest) = match text.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (text, ""),
        };
        if STRUCTURE_KEYWORDS.contains(&first) || EFFECT_KEYWORDS.contains(&first) {
            return LineKind::Keyword(first, rest);
        }
        if let Some((name, rest)) = text.split_once(':') {
            let name = name.trim();
            if is_identifier(name) {
                return LineKind::Speaker(name, rest.trim());
            }
        }
        LineKind::Unknown
    }

    fn keyword(&self) -> Option<&str> {
        match self.kind() {
            LineKind::Keyword(kw, _) => Some(kw),
            _ => None,
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.number,
            message: message.into(),
            source_line: self.text.clone(),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Cut a raw line at its first `#` that is neither quoted nor escaped.
/// Escapes are kept for the text and token readers to resolve.
fn strip_comment(raw: &str) -> &str {
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quote = !in_quote,
            '#' if !in_quote => return &raw[..i],
            _ => {}
        }
    }
    raw
}

/// Resolve `\x` escapes to `x`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Split a leading quoted string off `s` (which must start with `"`),
/// returning its unescaped content and the remainder after the closing
/// quote.
fn split_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some((unescape(&body[..i]), &body[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Parse display text: quoted literal, `@key`, or unquoted literal.
fn parse_text(raw: &str, line: &SourceLine) -> Result<Text, ScriptError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(line.error("missing text"));
    }
    if raw.starts_with('"') {
        let (text, rest) = split_quoted(raw).ok_or_else(|| line.error("unterminated quote"))?;
        if !rest.trim().is_empty() {
            return Err(line.error("unexpected text after closing quote"));
        }
        return Ok(Text::Literal(text));
    }
    if let Some(key) = raw.strip_prefix('@') {
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(line.error("malformed localization key"));
        }
        return Ok(Text::Key(key.to_string()));
    }
    if raw.contains(':') {
        return Err(line.error("text containing ':' must be quoted"));
    }
    Ok(Text::Literal(unescape(raw)))
}

/// An argument token. Quoted tokens are always strings.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    quoted: bool,
}

fn tokenize(mut s: &str, line: &SourceLine) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            return Ok(tokens);
        }
        if s.starts_with('"') {
            let (text, rest) = split_quoted(s).ok_or_else(|| line.error("unterminated quote"))?;
            tokens.push(Token { text, quoted: true });
            s = rest;
        } else {
            let end = s.find(char::is_whitespace).unwrap_or(s.len());
            tokens.push(Token {
                text: unescape(&s[..end]),
                quoted: false,
            });
            s = &s[end..];
        }
    }
}

/// Argument accessors that turn arity and type mismatches into
/// line-numbered errors.
struct Args<'a> {
    what: &'a str,
    tokens: &'a [Token],
    line: &'a SourceLine,
}

impl<'a> Args<'a> {
    fn expect(&self, count: usize) -> Result<(), ScriptError> {
        if self.tokens.len() == count {
            Ok(())
        } else {
            Err(self.line.error(format!(
                "{} expects {} argument(s), found {}",
                self.what,
                count,
                self.tokens.len()
            )))
        }
    }

    fn id(&self, i: usize) -> String {
        self.tokens[i].text.clone()
    }

    fn value(&self, i: usize) -> Value {
        let token = &self.tokens[i];
        if token.quoted {
            Value::Text(token.text.clone())
        } else {
            Value::from_token(&token.text)
        }
    }

    fn number(&self, i: usize) -> Result<f64, ScriptError> {
        match self.value(i) {
            Value::Number(n) => Ok(n),
            Value::Text(t) => Err(self.line.error(format!("expected a number, found `{t}`"))),
        }
    }

    fn integer(&self, i: usize) -> Result<i64, ScriptError> {
        let text = &self.tokens[i].text;
        text.parse::<i64>()
            .map_err(|_| self.line.error(format!("expected an integer, found `{text}`")))
    }

    fn count(&self, i: usize) -> Result<u32, ScriptError> {
        let text = &self.tokens[i].text;
        text.parse::<u32>()
            .map_err(|_| self.line.error(format!("expected a non-negative integer, found `{text}`")))
    }

    fn hour(&self, i: usize) -> Result<u32, ScriptError> {
        let hour = self.count(i)?;
        if hour > 24 {
            return Err(self.line.error(format!("hour {hour} is out of range 0..=24")));
        }
        Ok(hour)
    }

    fn boolean(&self, i: usize) -> Result<bool, ScriptError> {
        match self.tokens[i].text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(self.line.error(format!("expected true or false, found `{other}`"))),
        }
    }
}

fn parse_condition(rest: &str, line: &SourceLine) -> Result<Condition, ScriptError> {
    let tokens = tokenize(rest, line)?;
    let (name, tokens) = tokens
        .split_first()
        .ok_or_else(|| line.error("missing condition"))?;
    let args = Args {
        what: &name.text,
        tokens,
        line,
    };

    let condition = match name.text.as_str() {
        "hasFlag" | "notFlag" | "hasItem" | "notItem" | "atLocation" | "characterInParty" => {
            args.expect(1)?;
            let id = args.id(0);
            match name.text.as_str() {
                "hasFlag" => Condition::HasFlag(id),
                "notFlag" => Condition::NotFlag(id),
                "hasItem" => Condition::HasItem(id),
                "notItem" => Condition::NotItem(id),
                "atLocation" => Condition::AtLocation(id),
                _ => Condition::CharacterInParty(id),
            }
        }
        "variableEquals" => {
            args.expect(2)?;
            Condition::VariableEquals {
                name: args.id(0),
                value: args.value(1),
            }
        }
        "variableGreaterThan" => {
            args.expect(2)?;
            Condition::VariableGreaterThan {
                name: args.id(0),
                value: args.number(1)?,
            }
        }
        "variableLessThan" => {
            args.expect(2)?;
            Condition::VariableLessThan {
                name: args.id(0),
                value: args.number(1)?,
            }
        }
        "questAtStage" => {
            args.expect(2)?;
            Condition::QuestAtStage {
                quest: args.id(0),
                stage: args.id(1),
            }
        }
        "characterAt" => {
            args.expect(2)?;
            Condition::CharacterAt {
                character: args.id(0),
                location: args.id(1),
            }
        }
        "relationshipAbove" => {
            args.expect(2)?;
            Condition::RelationshipAbove {
                character: args.id(0),
                value: args.number(1)?,
            }
        }
        "relationshipBelow" => {
            args.expect(2)?;
            Condition::RelationshipBelow {
                character: args.id(0),
                value: args.number(1)?,
            }
        }
        "timeBetween" => {
            args.expect(2)?;
            Condition::TimeBetween {
                start: args.hour(0)?,
                end: args.hour(1)?,
            }
        }
        "itemAt" => {
            args.expect(2)?;
            Condition::ItemAt {
                item: args.id(0),
                location: args.id(1),
            }
        }
        "diceRoll" => {
            args.expect(3)?;
            Condition::DiceRoll {
                min: args.integer(0)?,
                max: args.integer(1)?,
                threshold: args.integer(2)?,
            }
        }
        other => return Err(line.error(format!("unknown condition `{other}`"))),
    };
    Ok(condition)
}

fn parse_effect(keyword: &str, rest: &str, line: &SourceLine) -> Result<Effect, ScriptError> {
    if keyword == "NOTIFY" {
        return Ok(Effect::Notify(parse_text(rest, line)?));
    }

    let tokens = tokenize(rest, line)?;
    let target = tokens.first().map(|t| t.text.as_str()).unwrap_or("");
    let what = format!("{keyword} {target}");
    let args = Args {
        what: what.trim_end(),
        tokens: tokens.get(1..).unwrap_or(&[]),
        line,
    };

    let effect = match (keyword, target) {
        ("SET", "flag") => {
            args.expect(1)?;
            Effect::SetFlag(args.id(0))
        }
        ("CLEAR", "flag") => {
            args.expect(1)?;
            Effect::ClearFlag(args.id(0))
        }
        ("SET", "variable") => {
            args.expect(2)?;
            Effect::SetVariable {
                name: args.id(0),
                value: args.value(1),
            }
        }
        ("ADD", "variable") => {
            args.expect(2)?;
            Effect::AddVariable {
                name: args.id(0),
                amount: args.number(1)?,
            }
        }
        ("ADD", "item") => {
            args.expect(1)?;
            Effect::AddItem(args.id(0))
        }
        ("REMOVE", "item") => {
            args.expect(1)?;
            Effect::RemoveItem(args.id(0))
        }
        ("MOVE", "item") => {
            args.expect(2)?;
            Effect::MoveItem {
                item: args.id(0),
                location: args.id(1),
            }
        }
        ("SET", "location") => {
            args.expect(1)?;
            Effect::ChangeLocation(args.id(0))
        }
        ("ADVANCE", "time") => {
            args.expect(1)?;
            Effect::AdvanceTime {
                hours: args.count(0)?,
            }
        }
        ("SET", "quest") => {
            args.expect(2)?;
            Effect::SetQuestStage {
                quest: args.id(0),
                stage: args.id(1),
            }
        }
        ("UNLOCK", "journal") => {
            args.expect(1)?;
            Effect::UnlockJournal(args.id(0))
        }
        ("START", "dialogue") => {
            args.expect(1)?;
            Effect::StartDialogue(args.id(0))
        }
        ("SET" | "ADD", "character") => parse_character_effect(keyword, &args)?,
        ("ENABLE", "map") => {
            args.expect(0)?;
            Effect::EnableMap
        }
        ("DISABLE", "map") => {
            args.expect(0)?;
            Effect::DisableMap
        }
        ("PLAY", "music" | "sound" | "video" | "interlude") => {
            args.expect(1)?;
            let id = args.id(0);
            match target {
                "music" => Effect::PlayMusic(id),
                "sound" => Effect::PlaySound(id),
                "video" => Effect::PlayVideo(id),
                _ => Effect::PlayInterlude(id),
            }
        }
        ("ROLL", _) => {
            let args = Args {
                what: "ROLL",
                tokens: &tokens,
                line,
            };
            args.expect(3)?;
            Effect::RollDice {
                variable: args.id(0),
                min: args.integer(1)?,
                max: args.integer(2)?,
            }
        }
        _ => return Err(line.error(format!("unknown effect `{}`", what.trim_end()))),
    };
    Ok(effect)
}

/// `SET|ADD character <id> <field> ...`
fn parse_character_effect(keyword: &str, args: &Args<'_>) -> Result<Effect, ScriptError> {
    let field = args.tokens.get(1).map(|t| t.text.as_str()).unwrap_or("");
    let effect = match (keyword, field) {
        ("SET", "location") => {
            args.expect(3)?;
            Effect::SetCharacterLocation {
                character: args.id(0),
                location: args.id(2),
            }
        }
        ("SET", "party") => {
            args.expect(3)?;
            Effect::SetCharacterParty {
                character: args.id(0),
                in_party: args.boolean(2)?,
            }
        }
        ("SET", "relationship") => {
            args.expect(3)?;
            Effect::SetRelationship {
                character: args.id(0),
                value: args.number(2)?,
            }
        }
        ("ADD", "relationship") => {
            args.expect(3)?;
            Effect::AddRelationship {
                character: args.id(0),
                amount: args.number(2)?,
            }
        }
        ("SET", "stat") => {
            args.expect(4)?;
            Effect::SetStat {
                character: args.id(0),
                stat: args.id(2),
                value: args.number(3)?,
            }
        }
        ("ADD", "stat") => {
            args.expect(4)?;
            Effect::AddStat {
                character: args.id(0),
                stat: args.id(2),
                amount: args.number(3)?,
            }
        }
        _ => {
            return Err(args
                .line
                .error(format!("unknown character field `{field}` for {keyword}")))
        }
    };
    Ok(effect)
}

/// Where a `GOTO` inside a block leads.
enum Goto {
    Node(String),
    Location(String),
}

fn parse_goto(rest: &str, line: &SourceLine) -> Result<Goto, ScriptError> {
    let tokens = tokenize(rest, line)?;
    match tokens.as_slice() {
        [target] => Ok(Goto::Node(target.text.clone())),
        [kw, location] if kw.text == "location" => Ok(Goto::Location(location.text.clone())),
        _ => Err(line.error("GOTO expects a node id or `location <id>`")),
    }
}

/// Effects and next-node collected by a CHOICE or IF block.
#[derive(Default)]
struct BlockBody {
    conditions: Vec<Condition>,
    effects: Vec<Effect>,
    next: Option<String>,
}

struct Parser {
    lines: Vec<SourceLine>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let text = strip_comment(raw).trim();
                (!text.is_empty()).then(|| SourceLine {
                    number: i + 1,
                    text: text.to_string(),
                })
            })
            .collect();
        Self { lines, pos: 0 }
    }

    fn peek(&self) -> Option<SourceLine> {
        self.lines.get(self.pos).cloned()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn parse(mut self, id: &str) -> Result<Dialogue, ScriptError> {
        let mut trigger_location_id = None;
        let mut conditions = Vec::new();

        while let Some(line) = self.peek() {
            match line.kind() {
                LineKind::Keyword("NODE", _) => break,
                LineKind::Keyword("TRIGGER", rest) => {
                    let tokens = tokenize(rest, &line)?;
                    if tokens.len() != 1 {
                        return Err(line.error("TRIGGER expects one location id"));
                    }
                    if trigger_location_id.is_some() {
                        return Err(line.error("duplicate TRIGGER"));
                    }
                    trigger_location_id = Some(tokens[0].text.clone());
                }
                LineKind::Keyword("REQUIRE", rest) => {
                    conditions.push(parse_condition(rest, &line)?);
                }
                _ => return Err(line.error("expected TRIGGER, REQUIRE or NODE")),
            }
            self.advance();
        }

        let mut nodes: Vec<Node> = Vec::new();
        while let Some(header) = self.peek() {
            let node = self.parse_node()?;
            if nodes.iter().any(|n| n.id == node.id) {
                return Err(header.error(format!("duplicate node id `{}`", node.id)));
            }
            nodes.push(node);
        }

        let start_node_id = nodes.first().ok_or(ScriptError::NoNodes)?.id.clone();
        Ok(Dialogue {
            id: id.to_string(),
            start_node_id,
            nodes,
            trigger_location_id,
            conditions,
        })
    }

    fn parse_node(&mut self) -> Result<Node, ScriptError> {
        let header = self.peek().ok_or(ScriptError::NoNodes)?;
        let id = match header.kind() {
            LineKind::Keyword("NODE", rest) => {
                let tokens = tokenize(rest, &header)?;
                match tokens.as_slice() {
                    [id] => id.text.clone(),
                    _ => return Err(header.error("NODE expects one id")),
                }
            }
            _ => return Err(header.error("expected NODE")),
        };
        self.advance();

        let mut node = Node::new(id);
        let mut has_speaker = false;

        while let Some(line) = self.peek() {
            match line.kind() {
                LineKind::Keyword("NODE", _) => break,
                LineKind::Keyword("CHOICE", rest) => {
                    self.advance();
                    let tokens = rest.trim();
                    let (choice_id, text) = match tokens.split_once(char::is_whitespace) {
                        Some((id, text)) => (id, text),
                        None => return Err(line.error("CHOICE expects an id and text")),
                    };
                    if node.choice(choice_id).is_some() {
                        return Err(line.error(format!("duplicate choice id `{choice_id}`")));
                    }
                    let text = parse_text(text, &line)?;
                    let body = self.parse_block(true)?;
                    node.choices.push(Choice {
                        id: choice_id.to_string(),
                        text,
                        conditions: body.conditions,
                        effects: body.effects,
                        next: body.next,
                    });
                }
                LineKind::Keyword("IF", rest) => {
                    self.advance();
                    let condition = parse_condition(rest, &line)?;
                    let body = self.parse_block(false)?;
                    node.conditional_next.push(Branch {
                        condition,
                        effects: body.effects,
                        next: body.next,
                    });
                }
                LineKind::Keyword("GOTO", rest) => {
                    self.advance();
                    match parse_goto(rest, &line)? {
                        Goto::Node(target) => {
                            if node.next.is_some() {
                                return Err(line.error("node already has a GOTO"));
                            }
                            node.next = Some(target);
                        }
                        Goto::Location(_) => {
                            return Err(line.error("GOTO location is only valid inside CHOICE or IF"))
                        }
                    }
                }
                LineKind::Keyword("VOICE", rest) | LineKind::Keyword("PORTRAIT", rest) => {
                    self.advance();
                    let tokens = tokenize(rest, &line)?;
                    let [value] = tokens.as_slice() else {
                        return Err(line.error("expected exactly one id"));
                    };
                    let slot = if line.keyword() == Some("VOICE") {
                        &mut node.voice
                    } else {
                        &mut node.portrait
                    };
                    if slot.is_some() {
                        return Err(line.error("override already set for this node"));
                    }
                    *slot = Some(value.text.clone());
                }
                LineKind::Keyword("REQUIRE", _) => {
                    return Err(line.error("REQUIRE outside a CHOICE block"))
                }
                LineKind::Keyword("TRIGGER", _) => {
                    return Err(line.error("TRIGGER must precede the first NODE"))
                }
                LineKind::Keyword("END", _) => {
                    return Err(line.error("END outside a CHOICE or IF block"))
                }
                LineKind::Keyword(keyword, rest) => {
                    self.advance();
                    node.effects.push(parse_effect(keyword, rest, &line)?);
                }
                LineKind::Speaker(name, text) => {
                    self.advance();
                    if has_speaker {
                        return Err(line.error("node already has a speaker line"));
                    }
                    has_speaker = true;
                    node.speaker = if name.eq_ignore_ascii_case("narrator") {
                        None
                    } else {
                        Some(name.to_lowercase())
                    };
                    node.text = Some(parse_text(text, &line)?);
                }
                LineKind::Unknown => return Err(line.error("unrecognized line")),
            }
        }

        Ok(node)
    }

    /// Body of a CHOICE (`allow_require`) or IF block. Closes at its
    /// terminal GOTO/END, or before any line that only makes sense at
    /// node level.
    fn parse_block(&mut self, allow_require: bool) -> Result<BlockBody, ScriptError> {
        let mut body = BlockBody::default();

        while let Some(line) = self.peek() {
            match line.kind() {
                LineKind::Keyword("NODE" | "CHOICE" | "IF" | "VOICE" | "PORTRAIT", _)
                | LineKind::Speaker(..) => break,
                LineKind::Keyword("REQUIRE", rest) => {
                    if !allow_require {
                        return Err(line.error("IF takes a single inline condition"));
                    }
                    self.advance();
                    body.conditions.push(parse_condition(rest, &line)?);
                }
                LineKind::Keyword("GOTO", rest) => {
                    self.advance();
                    match parse_goto(rest, &line)? {
                        Goto::Node(target) => body.next = Some(target),
                        Goto::Location(location) => {
                            body.effects.push(Effect::ChangeLocation(location));
                            body.effects.push(Effect::EndDialogue);
                        }
                    }
                    break;
                }
                LineKind::Keyword("END", rest) => {
                    if !rest.is_empty() {
                        return Err(line.error("END takes no arguments"));
                    }
                    self.advance();
                    body.effects.push(Effect::EndDialogue);
                    break;
                }
                LineKind::Keyword("TRIGGER", _) => {
                    return Err(line.error("TRIGGER must precede the first NODE"))
                }
                LineKind::Keyword(keyword, rest) => {
                    self.advance();
                    body.effects.push(parse_effect(keyword, rest, &line)?);
                }
                LineKind::Unknown => return Err(line.error("unrecognized line")),
            }
        }

        Ok(body)
    }
}
