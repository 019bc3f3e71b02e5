//! End-to-end tests running parsed scripts through the engine.


use zl_diagnostic::Diagnostic;
use zl_ir::Node;

use crate::{Engine, ExecContext, Scope};

pub(crate) fn parse(src: &str) -> Node {
    zl_parse::parse_string(src, "test.zl").expect("script parses")
}

pub(crate) fn run(engine: &Engine, src: &str, scope: &Scope) -> Result<(), Diagnostic> {
    let root = parse(src);
    let ctx = ExecContext::new(engine);
    engine.run(&ctx, &root, scope)
}
