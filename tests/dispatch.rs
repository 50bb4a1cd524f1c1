use rome_loader::text::{Parser, Pattern, Scope, TokenStream, UnregisteredPolicy};
use rome_loader::ErrorKind;
use std::cell::RefCell;

#[test]
fn each_handler_called_once() {
    let calls = RefCell::new(Vec::new());
    let inner = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register("a", |_, v| {
        calls.borrow_mut().push(format!("a={}", v.read_u64()?));
        Ok(())
    });
    parser.register("b", |_, v| {
        calls.borrow_mut().push(format!("b={}", v.read_string()?));
        Ok(())
    });
    parser.register("c", |_, v| {
        calls.borrow_mut().push(String::from("c"));
        let mut nested = Parser::new();
        nested.register("d", |_, v| {
            inner.borrow_mut().push(v.read_u64()?);
            Ok(())
        });
        nested.parse(v.scope()?)?;
        Ok(())
    });

    let mut parser = Some(parser);
    let ignored = RefCell::new(None);
    let mut root = Parser::new();
    root.register("root", |_, v| {
        if let Some(parser) = parser.take() {
            *ignored.borrow_mut() = Some(parser.parse(v.scope()?)?);
        }
        Ok(())
    });
    root.parse_slice(br#"root = { a = 1 b = "x y" c = { d = 2 } }"#)
        .unwrap();

    let ignored = ignored.into_inner().unwrap();
    drop(parser);
    assert!(ignored.is_empty());
    assert_eq!(calls.into_inner(), vec!["a=1", "b=x y", "c"]);
    assert_eq!(inner.into_inner(), vec![2]);
}

#[test]
fn unconsumed_values_are_drained() {
    let seen = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register("skip_me", |_, _| Ok(()));
    parser.register("after", |_, v| {
        seen.borrow_mut().push(v.read_u64()?);
        Ok(())
    });
    parser
        .parse_slice(b"skip_me = { a = { b = { c = 1 } } d = 2 } after = 3")
        .unwrap();
    assert_eq!(seen.into_inner(), vec![3]);
}

#[test]
fn collected_keys_belong_to_one_parse() {
    let mut parser = Parser::with_policy(UnregisteredPolicy::Collect);
    parser.register("known", |_, _| Ok(()));
    let ignored = parser
        .parse_slice(b"known = 1 unknown = 2 other = { x = 1 } unknown = 3")
        .unwrap();
    assert_eq!(ignored.iter().collect::<Vec<_>>(), vec!["other", "unknown"]);

    let parser = Parser::with_policy(UnregisteredPolicy::Collect);
    let ignored = parser.parse_slice(b"fresh = 1").unwrap();
    assert_eq!(ignored.iter().collect::<Vec<_>>(), vec!["fresh"]);
}

#[test]
fn numeric_keys_and_keywords() {
    let seen = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register(Pattern::AnyUnsigned, |key, _| {
        seen.borrow_mut().push(format!("id {}", key.read_u64()?));
        Ok(())
    });
    parser.register("10", |_, _| {
        seen.borrow_mut().push(String::from("keyword 10"));
        Ok(())
    });
    parser.register_catch_all(|key, _| {
        seen.borrow_mut().push(format!("other {}", key.text()));
        Ok(())
    });
    parser.parse_slice(b"5 = { } 10 = { } name = x -3 = y").unwrap();
    assert_eq!(
        seen.into_inner(),
        vec!["id 5", "keyword 10", "other name", "other -3"]
    );
}

#[test]
fn header_scope_and_lists() {
    let colors = RefCell::new(Vec::new());
    let ids = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register("color", |_, v| {
        let header = v.header().map(|x| x.to_utf8_owned());
        colors.borrow_mut().push((header, v.read_u64s()?));
        Ok(())
    });
    parser.register("ids", |_, v| {
        ids.borrow_mut().extend(v.read_u64s()?);
        Ok(())
    });
    parser
        .parse_slice(b"color = rgb { 10 20 30 } ids = { 1 2 3 } ids = 4")
        .unwrap();
    assert_eq!(
        colors.into_inner(),
        vec![(Some(String::from("rgb")), vec![10, 20, 30])]
    );
    assert_eq!(ids.into_inner(), vec![1, 2, 3, 4]);
}

#[test]
fn object_lists() {
    let names = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register("entries", |_, v| {
        v.for_each_scope(|item| {
            let mut inner = Parser::new();
            inner.register("name", |_, v| {
                names.borrow_mut().push(v.read_string()?);
                Ok(())
            });
            inner.parse(item.scope()?)?;
            Ok(())
        })
    });
    parser
        .parse_slice(br#"entries = { { name = "a" } { name = "b" extra = 1 } }"#)
        .unwrap();
    assert_eq!(names.into_inner(), vec!["a", "b"]);
}

#[test]
fn handler_error_propagates() {
    let mut parser = Parser::new();
    parser.register("outer", |_, v| {
        let mut inner = Parser::new();
        inner.register("n", |_, v| v.read_u64().map(|_| ()));
        inner.parse(v.scope()?)?;
        Ok(())
    });
    let err = parser.parse_slice(b"outer = { n = abc }").unwrap_err();
    match err.kind() {
        ErrorKind::Scalar { position, .. } => assert_eq!(position.column, 14),
        kind => panic!("unexpected error {:?}", kind),
    }
}

#[test]
fn unclosed_scope_is_eof() {
    let mut parser = Parser::new();
    parser.register("a", |_, v| {
        Parser::new().parse(v.scope()?)?;
        Ok(())
    });
    let err = parser.parse_slice(b"a = { b = 1").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Eof { .. }));
}

#[test]
fn stray_tokens_are_skipped() {
    let seen = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register("a", |_, v| {
        seen.borrow_mut().push(v.read_u64()?);
        Ok(())
    });
    parser.parse_slice(b"} a = 1 = { x } a = 2").unwrap();
    assert_eq!(seen.into_inner(), vec![1, 2]);
}

#[test]
fn parse_from_token_stream() {
    let total = RefCell::new(0);
    let mut stream = TokenStream::new(b"\xef\xbb\xbfa = 1 # comment\n a = 2");
    let mut parser = Parser::new();
    parser.register("a", |_, v| {
        *total.borrow_mut() += v.read_u64()?;
        Ok(())
    });
    parser.parse(&mut Scope::root(&mut stream)).unwrap();
    assert_eq!(total.into_inner(), 3);
}
