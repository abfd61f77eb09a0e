use anyhow::Result;
use tablex::{ParseError, ParseTable, Position, TransitionTable};
use tablex_gen::{
    Associativity, ConfigError, ConflictKind, Grammar, GrammarBuilder, LexerConfig, LexerRuntime,
    LookaheadMode, Parser, ParserConfig, create_parser,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Integer calculator: `+ - * / ^`, unary minus, parentheses, `#` comments.
fn calc() -> Result<Grammar<i64>> {
    let mut g = GrammarBuilder::<i64>::new();
    let num = g.terminal_with("[0-9]+", |s| s.parse().unwrap_or_default())?;
    let plus = g.literal("+")?;
    let minus = g.literal("-")?;
    let star = g.literal("*")?;
    let slash = g.literal("/")?;
    let caret = g.literal("^")?;
    let lparen = g.literal("(")?;
    let rparen = g.literal(")")?;
    g.ignore("[ \t\n]+")?;
    g.ignore("#[^\n]*")?;

    g.precedence(Associativity::Left, &[plus, minus]);
    g.precedence(Associativity::Left, &[star, slash]);
    let unary = g.precedence(Associativity::Right, &[]);
    g.precedence(Associativity::Right, &[caret]);

    let e = g.non_terminal("Expr");
    g.rule(e, &[e.into(), plus.into(), e.into()])
        .reduce(|v| v[0] + v[2]);
    g.rule(e, &[e.into(), minus.into(), e.into()])
        .reduce(|v| v[0] - v[2]);
    g.rule(e, &[e.into(), star.into(), e.into()])
        .reduce(|v| v[0] * v[2]);
    g.rule(e, &[e.into(), slash.into(), e.into()])
        .reduce(|v| if v[2] == 0 { 0 } else { v[0] / v[2] });
    g.rule(e, &[e.into(), caret.into(), e.into()])
        .reduce(|v| v[0].pow(v[2] as u32));
    g.rule(e, &[minus.into(), e.into()])
        .reduce(|v| -v[1])
        .precedence(unary);
    g.rule(e, &[lparen.into(), e.into(), rparen.into()])
        .reduce(|v| v[1]);
    g.rule(e, &[num.into()]);
    Ok(g.build()?)
}

#[test]
fn power_binds_tighter_than_plus() -> Result<()> {
    init_logger();
    let p = create_parser(calc()?)?;
    assert!(p.conflicts().is_empty());
    assert_eq!(p.parse("3^4 + 1")?, 82);
    Ok(())
}

#[test]
fn left_associative_arithmetic() -> Result<()> {
    init_logger();
    let p = create_parser(calc()?)?;
    assert_eq!(p.parse("7+8*2-2+2")?, 23);
    assert_eq!(p.parse("100 / 10 / 5")?, 2);
    assert_eq!(p.parse("(7+8)*2")?, 30);
    Ok(())
}

#[test]
fn power_is_right_associative() -> Result<()> {
    let p = create_parser(calc()?)?;
    assert_eq!(p.parse("2^3^2")?, 512);
    Ok(())
}

#[test]
fn unary_minus_uses_rule_precedence() -> Result<()> {
    let p = create_parser(calc()?)?;
    assert_eq!(p.parse("-2^2")?, -4);
    assert_eq!(p.parse("-2*3")?, -6);
    assert_eq!(p.parse("2 - -3")?, 5);
    Ok(())
}

#[test]
fn whitespace_and_comments_are_ignored() -> Result<()> {
    let p = create_parser(calc()?)?;
    assert_eq!(p.parse("1 +   # one more\n\t2 # trailing")?, 3);
    Ok(())
}

#[test]
fn unmatched_parenthesis_reports_position_and_expected() -> Result<()> {
    init_logger();
    let p = create_parser(calc()?)?;
    match p.parse("(3") {
        Err(ParseError::UnexpectedToken {
            offset,
            found,
            expected,
            ..
        }) => {
            assert_eq!(offset, 2);
            assert_eq!(found, tablex::END_NAME);
            assert!(!expected.is_empty());
            assert!(expected.contains(&"\\)".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn bad_character_is_a_lexical_error() -> Result<()> {
    let p = create_parser(calc()?)?;
    match p.parse("1 $ 2") {
        Err(ParseError::Lexical(e)) => {
            assert_eq!(e.offset, 2);
            assert_eq!(e.found, '$');
            assert_eq!(e.position, Position::new(1, 2));
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn conflicting_conversion_fails_at_construction() {
    let mut g = GrammarBuilder::<i64>::new();
    g.terminal_with("[0-9]+", |s| s.parse().unwrap_or_default())
        .unwrap();
    let err = g.terminal_with("[0-9]+", |s| s.len() as i64).unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingTerminal(_)));
}

#[test]
fn unicode_and_latin_terminals_under_both_runtimes() -> Result<()> {
    init_logger();
    let input = "nasse خنزير صغير nasse";
    let mut tokens = Vec::new();
    for runtime in [LexerRuntime::Tabular, LexerRuntime::Nfa] {
        let mut c = LexerConfig::<i64>::new();
        let word = c.token("[a-z]+")?;
        let pig = c.token("خنزير صغير")?;
        c.ignore(" +")?.runtime(runtime);
        let lexer = c.build()?;
        let found: Vec<_> = lexer
            .tokenize(input)?
            .into_iter()
            .map(|t| (t.kind, t.offset, t.length, t.column()))
            .collect();
        assert_eq!(
            found,
            vec![
                (word.0, 0, 5, 0),
                (pig.0, 6, 10, 6),
                (word.0, 17, 5, 17),
                (lexer.end_kind(), 22, 0, 22),
            ]
        );
        tokens.push(found);
    }
    assert_eq!(tokens[0], tokens[1]);
    Ok(())
}

#[test]
fn tree_spans_cover_children() -> Result<()> {
    let p = create_parser(calc()?)?;
    let tree = p.parse_tree("1 +\n  2")?;
    assert_eq!(*tree.value(), 3);
    assert_eq!(tree.span().start, Position::new(1, 0));
    assert_eq!(tree.span().end, Position::new(2, 3));
    assert_eq!(tree.offset(), 0);
    assert_eq!(tree.len(), 7);
    let leaves: Vec<_> = tree.leaves().iter().map(|t| t.text.to_string()).collect();
    assert_eq!(leaves, ["1", "+", "2"]);
    Ok(())
}

#[test]
fn empty_rule_node_sits_after_previous_token() -> Result<()> {
    let mut g = GrammarBuilder::<i64>::new();
    let open = g.literal("[")?;
    let close = g.literal("]")?;
    let num = g.terminal_with("[0-9]+", |s| s.parse().unwrap_or_default())?;
    g.ignore(" +")?;
    let list = g.non_terminal("List");
    let items = g.non_terminal("Items");
    g.rule(list, &[open.into(), items.into(), close.into()])
        .reduce(|v| v[1]);
    g.rule(items, &[]).reduce(|_| 0);
    g.rule(items, &[items.into(), num.into()])
        .reduce(|v| v[0] + v[1]);
    let p = create_parser(g.build()?)?;

    assert_eq!(p.parse("[ 1 2 3 ]")?, 6);
    let tree = p.parse_tree("[ ]")?;
    let empty = &tree.children()[1];
    assert!(!empty.is_leaf());
    assert!(empty.is_empty());
    assert_eq!(empty.offset(), 1);
    assert_eq!(empty.span().start, Position::new(1, 1));
    Ok(())
}

/// `S → L = R | R`, `L → * R | id`, `R → L`.
fn assignment() -> Result<Grammar<i64>> {
    let mut g = GrammarBuilder::<i64>::new();
    let eq = g.literal("=")?;
    let star = g.literal("*")?;
    let id = g.terminal("[a-z]+")?;
    g.ignore(" +")?;
    let s = g.non_terminal("S");
    let l = g.non_terminal("L");
    let r = g.non_terminal("R");
    g.rule(s, &[l.into(), eq.into(), r.into()]);
    g.rule(s, &[r.into()]);
    g.rule(l, &[star.into(), r.into()]);
    g.rule(l, &[id.into()]);
    g.rule(r, &[l.into()]);
    Ok(g.build()?)
}

#[test]
fn lalr_accepts_what_slr_cannot() -> Result<()> {
    init_logger();
    let slr = ParserConfig::new()
        .lookahead(LookaheadMode::Slr)
        .build(assignment()?)?;
    assert_eq!(slr.conflicts().len(), 1);
    assert_eq!(slr.conflicts()[0].kind, ConflictKind::ShiftReduce);
    assert_eq!(slr.conflicts()[0].terminal_name, "=");

    let lalr = create_parser(assignment()?)?;
    assert!(lalr.conflicts().is_empty());
    lalr.parse("*x = y")?;
    lalr.parse("**p")?;
    Ok(())
}

#[test]
fn stored_tables_round_trip() -> Result<()> {
    let built = create_parser(calc()?)?;
    let transitions = match built.transition_table() {
        Some(t) => t.to_bytes()?,
        None => panic!("tabular lexer expected"),
    };
    let table = built.table().to_bytes()?;

    let restored = Parser::from_tables(
        calc()?,
        TransitionTable::from_bytes(&transitions)?,
        ParseTable::from_bytes(&table)?,
    )?;
    assert_eq!(restored.parse("3^4 + 1")?, 82);
    assert_eq!(restored.table(), built.table());
    Ok(())
}

#[test]
fn construction_is_reproducible() -> Result<()> {
    let a = create_parser(calc()?)?;
    let b = create_parser(calc()?)?;
    assert_eq!(a.table().to_bytes()?, b.table().to_bytes()?);
    assert_eq!(a.transition_table(), b.transition_table());
    Ok(())
}
