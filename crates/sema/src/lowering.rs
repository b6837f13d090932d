//! Rewrites structured `REPEAT ... ENDREPEAT` blocks into the primitive
//! commands the rest of the pipeline understands.
//!
//! Grounded on the reference compiler's `repeat-stmt-rewriter`: each
//! `REPEAT count iter_var` becomes an initializer and a loop label, each
//! matching `ENDREPEAT` becomes an increment, a comparison, and a
//! conditional jump back to that label.

use gta3c_ast::{Argument, LinkedIr, ParserIr, ParserIrBuilder};
use gta3c_data_structures::{Arena, NameGenerator};
use gta3c_interface::Span;

struct PendingRepeat<'a> {
    iter_var: Argument<'a>,
    num_times: Argument<'a>,
    loop_label: &'a str,
}

/// Rewrites every matched `REPEAT`/`ENDREPEAT` pair in `input`, returning a
/// new stream. Unmatched `ENDREPEAT`s (no open `REPEAT`) pass through
/// unchanged, for semantic analysis to diagnose.
pub fn lower_repeats<'a>(
    arena: &'a Arena,
    name_gen: &NameGenerator,
    input: &LinkedIr<'a>,
) -> LinkedIr<'a> {
    let output = LinkedIr::new();
    let mut stack: Vec<PendingRepeat<'a>> = Vec::new();

    for node in input.iter() {
        match node.command {
            Some(cmd) if cmd.name == "REPEAT" && cmd.args.len() >= 2 => {
                let num_times = cmd.args[0];
                let iter_var = cmd.args[1];
                let loop_label = arena.alloc_str_upper(&name_gen.generate());

                push_label_if_present(arena, &output, node);
                output.push_back(set_zero(arena, iter_var, cmd.span));
                output.push_back(ParserIrBuilder::new(arena).label(loop_label, cmd.span).build());

                stack.push(PendingRepeat { iter_var, num_times, loop_label });
            }
            Some(cmd) if cmd.name == "ENDREPEAT" => match stack.pop() {
                Some(pending) => {
                    push_label_if_present(arena, &output, node);
                    output.push_back(increment(arena, pending.iter_var, cmd.span));
                    output.push_back(compare(
                        arena,
                        pending.iter_var,
                        pending.num_times,
                        cmd.span,
                    ));
                    output.push_back(goto_if_false(arena, pending.loop_label, cmd.span));
                }
                None => output.push_back(copy_node(arena, node)),
            },
            _ => output.push_back(copy_node(arena, node)),
        }
    }

    output
}

fn push_label_if_present<'a>(arena: &'a Arena, output: &LinkedIr<'a>, node: &ParserIr<'a>) {
    if let Some(label) = node.label {
        output.push_back(ParserIrBuilder::new(arena).label(label.name, label.span).build());
    }
}

fn copy_node<'a>(arena: &'a Arena, node: &ParserIr<'a>) -> &'a ParserIr<'a> {
    let mut builder = ParserIrBuilder::new(arena);
    if let Some(label) = node.label {
        builder = builder.label(label.name, label.span);
    }
    if let Some(cmd) = node.command {
        builder = builder.command(cmd.name, cmd.span);
        if cmd.not_flag {
            builder = builder.not_flag();
        }
        for &arg in cmd.args {
            builder = builder.arg(arg);
        }
    }
    builder.build()
}

fn set_zero<'a>(arena: &'a Arena, iter_var: Argument<'a>, span: Span) -> &'a ParserIr<'a> {
    ParserIrBuilder::new(arena).command("SET", span).arg(iter_var).arg_int(0, span).build()
}

fn increment<'a>(arena: &'a Arena, iter_var: Argument<'a>, span: Span) -> &'a ParserIr<'a> {
    ParserIrBuilder::new(arena)
        .command("ADD_THING_TO_THING", span)
        .arg(iter_var)
        .arg_int(1, span)
        .build()
}

fn compare<'a>(
    arena: &'a Arena,
    iter_var: Argument<'a>,
    num_times: Argument<'a>,
    span: Span,
) -> &'a ParserIr<'a> {
    ParserIrBuilder::new(arena)
        .command("IS_THING_GREATER_OR_EQUAL_TO_THING", span)
        .arg(iter_var)
        .arg(num_times)
        .build()
}

fn goto_if_false<'a>(arena: &'a Arena, loop_label: &str, span: Span) -> &'a ParserIr<'a> {
    ParserIrBuilder::new(arena).command("GOTO_IF_FALSE", span).arg_ident(loop_label, span).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gta3c_ast::ArgumentValue;
    use gta3c_interface::BytePos;

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    fn names<'a>(list: &LinkedIr<'a>) -> Vec<&'a str> {
        list.iter().filter_map(|n| n.command.map(|c| c.name)).collect()
    }

    #[test]
    fn rewrites_matched_repeat_block() {
        let arena = Arena::new();
        let name_gen = NameGenerator::with_prefix("L_");
        let input = LinkedIr::new();
        input.push_back(
            ParserIrBuilder::new(&arena)
                .command("REPEAT", sp())
                .arg_int(5, sp())
                .arg_ident("i", sp())
                .build(),
        );
        input.push_back(
            ParserIrBuilder::new(&arena).command("WAIT", sp()).arg_int(0, sp()).build(),
        );
        input.push_back(ParserIrBuilder::new(&arena).command("ENDREPEAT", sp()).build());

        let output = lower_repeats(&arena, &name_gen, &input);
        assert_eq!(
            names(&output),
            [
                "SET",
                "WAIT",
                "ADD_THING_TO_THING",
                "IS_THING_GREATER_OR_EQUAL_TO_THING",
                "GOTO_IF_FALSE",
            ]
        );

        let set_node = output.head().unwrap();
        assert_eq!(set_node.command.unwrap().args[0].value, ArgumentValue::Identifier("I"));
        let label_node = set_node.next().unwrap();
        assert!(label_node.command.is_none());
        assert!(label_node.label.is_some());

        let goto_node = output.iter().last().unwrap();
        let ArgumentValue::Identifier(target) = goto_node.command.unwrap().args[0].value else {
            panic!("expected identifier argument");
        };
        assert_eq!(target, label_node.label.unwrap().name);
    }

    #[test]
    fn unmatched_endrepeat_passes_through() {
        let arena = Arena::new();
        let name_gen = NameGenerator::new();
        let input = LinkedIr::new();
        input.push_back(ParserIrBuilder::new(&arena).command("ENDREPEAT", sp()).build());

        let output = lower_repeats(&arena, &name_gen, &input);
        assert_eq!(names(&output), ["ENDREPEAT"]);
    }
}
