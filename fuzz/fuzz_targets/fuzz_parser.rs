#![no_main]
use libfuzzer_sys::fuzz_target;
use rome_loader::text::{Lexer, Parser, Pattern};
use rome_loader::LoadOptions;

fuzz_target!(|data: &[u8]| {
    let tokens = Lexer::new(data).count();
    assert!(tokens <= data.len());

    let mut parser = Parser::new();
    parser.register(Pattern::CatchAll, |_, v| {
        if v.is_scope() {
            let inner = Parser::new();
            inner.parse(v.scope()?)?;
        }
        Ok(())
    });
    let _ = parser.parse_slice(data);

    let options = LoadOptions::builder("fuzz.rome").build();
    let _ = rome_loader::World::parse(data, &options);
});
