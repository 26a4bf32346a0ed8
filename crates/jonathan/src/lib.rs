#![doc = include_str!("../../../README.md")]
mod ast;
mod builtins;
mod bytecode;
mod error;
mod eval;
mod lexer;
mod parser;
mod repl;
mod run;
mod symbol_table;
mod token;
mod value;

pub use crate::{
    ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement},
    builtins::Builtin,
    bytecode::{Bytecode, Compiler, Instructions, Opcode, Vm, GLOBALS_SIZE, MAX_FRAMES, STACK_SIZE},
    error::{CompileError, RuntimeError},
    eval::{eval_program, Environment},
    lexer::Lexer,
    parser::Parser,
    repl::{run_repl, ReplSession},
    run::{run_source, Engine, EngineError},
    symbol_table::{LeftScope, Symbol, SymbolScope, SymbolTable},
    token::{Token, TokenKind},
    value::{Closure, CompiledFunction, Function, HashKey, HashPair, Type, Value},
};
