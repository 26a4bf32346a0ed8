//! Stack-based virtual machine.
//!
//! Execution state is an operand stack, a globals array, and a stack of call
//! frames; each frame runs one closure and marks where its locals live on
//! the operand stack. The machine fetches, decodes and executes until the
//! main frame runs out of instructions or a runtime error stops it.

use std::io::Write;
use std::rc::Rc;

use indexmap::IndexMap;

use super::compiler::Bytecode;
use super::op::{read_u16, Opcode};
use crate::builtins::Builtin;
use crate::error::{runtime_err, RunResult, RuntimeError};
use crate::value::{Closure, CompiledFunction, HashPair, Value};

/// Fixed operand stack size; pushing past it is a fatal runtime error.
pub const STACK_SIZE: usize = 2048;
/// Fixed globals array size; the compiler refuses to bind more names.
pub const GLOBALS_SIZE: usize = 65536;
/// Fixed call-frame stack size; deeper recursion is a runtime error.
pub const MAX_FRAMES: usize = 1024;

/// Per-call execution context.
#[derive(Debug)]
struct Frame {
    closure: Rc<Closure>,
    /// Index of the next instruction byte to fetch.
    ip: usize,
    /// Stack slot where this frame's locals begin.
    base_pointer: usize,
}

impl Frame {
    fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }
}

pub struct Vm<'a, W: Write> {
    constants: Vec<Value>,
    stack: Vec<Value>,
    /// Points one past the top of stack; `stack[sp]` is the last popped slot.
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
    /// Sink for `puts` output.
    output: &'a mut W,
}

impl<'a, W: Write> Vm<'a, W> {
    #[must_use]
    pub fn new(bytecode: Bytecode, output: &'a mut W) -> Self {
        Self::with_globals(bytecode, vec![Value::Null; GLOBALS_SIZE], output)
    }

    /// Creates a VM reusing a globals array from an earlier run, which is how
    /// a REPL session keeps `let` bindings alive across inputs.
    #[must_use]
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>, output: &'a mut W) -> Self {
        let main_function = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            function: Rc::new(main_function),
            free: Vec::new(),
        };
        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(Rc::new(main_closure), 0));
        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames,
            output,
        }
    }

    /// Hands the globals array back for the next REPL input.
    #[must_use]
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The value sitting just above the stack pointer: what the last `Pop`
    /// removed. This is how the result of an expression statement is
    /// observed without leaving it on the stack.
    #[must_use]
    pub fn last_popped(&self) -> &Value {
        &self.stack[self.sp]
    }

    /// Runs to completion or the first runtime error.
    pub fn run(&mut self) -> RunResult<()> {
        while self.current_frame().ip < self.current_frame().closure.function.instructions.len() {
            let frame = self.current_frame_mut();
            let byte = frame.closure.function.instructions.bytes()[frame.ip];
            frame.ip += 1;
            let Some(op) = Opcode::from_repr(byte) else {
                return runtime_err!("opcode {byte} undefined");
            };

            match op {
                Opcode::LoadConst => {
                    let index = self.fetch_u16();
                    let constant = self.constants[index].clone();
                    self.push(constant)?;
                }
                Opcode::Pop => {
                    self.pop();
                }

                Opcode::BinaryAdd | Opcode::BinarySub | Opcode::BinaryMul | Opcode::BinaryDiv => {
                    self.execute_binary_operation(op)?;
                }
                Opcode::CompareEq | Opcode::CompareNe | Opcode::CompareGt => {
                    self.execute_comparison(op)?;
                }

                Opcode::LoadTrue => self.push(Value::Boolean(true))?,
                Opcode::LoadFalse => self.push(Value::Boolean(false))?,
                Opcode::LoadNull => self.push(Value::Null)?,

                Opcode::UnaryNot => {
                    let operand = self.pop();
                    self.push(Value::Boolean(!operand.is_truthy()))?;
                }
                Opcode::UnaryNeg => {
                    let operand = self.pop();
                    match operand {
                        Value::Integer(value) => self.push(Value::Integer(value.wrapping_neg()))?,
                        other => {
                            return runtime_err!(
                                "unsupported type for negation: {}",
                                other.type_tag()
                            )
                        }
                    }
                }

                Opcode::Jump => {
                    let target = self.fetch_u16();
                    self.current_frame_mut().ip = target;
                }
                Opcode::JumpIfFalse => {
                    let target = self.fetch_u16();
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target;
                    }
                }

                Opcode::StoreGlobal => {
                    let index = self.fetch_u16();
                    self.globals[index] = self.pop();
                }
                Opcode::LoadGlobal => {
                    let index = self.fetch_u16();
                    let value = self.globals[index].clone();
                    self.push(value)?;
                }
                Opcode::StoreLocal => {
                    let index = self.fetch_u8();
                    let base = self.current_frame().base_pointer;
                    self.stack[base + index] = self.pop();
                }
                Opcode::LoadLocal => {
                    let index = self.fetch_u8();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack[base + index].clone();
                    self.push(value)?;
                }

                Opcode::BuildArray => {
                    let count = self.fetch_u16();
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::Array(Rc::new(elements)))?;
                }
                Opcode::BuildHash => {
                    let count = self.fetch_u16();
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    let value = execute_index(&left, &index)?;
                    self.push(value)?;
                }

                Opcode::Call => {
                    let num_args = self.fetch_u8();
                    self.execute_call(num_args)?;
                }
                Opcode::ReturnValue => {
                    let value = self.pop();
                    // A return in the main frame ends the program; the value
                    // stays observable as the last popped element.
                    if self.frames.len() == 1 {
                        self.stack[self.sp] = value;
                        return Ok(());
                    }
                    let frame = self.frames.pop().expect("return with no active frame");
                    self.sp = frame.base_pointer - 1;
                    self.push(value)?;
                }
                Opcode::ReturnNull => {
                    if self.frames.len() == 1 {
                        self.stack[self.sp] = Value::Null;
                        return Ok(());
                    }
                    let frame = self.frames.pop().expect("return with no active frame");
                    self.sp = frame.base_pointer - 1;
                    self.push(Value::Null)?;
                }

                Opcode::LoadBuiltin => {
                    let index = self.fetch_u8();
                    let Some(builtin) = Builtin::from_repr(index as u8) else {
                        return runtime_err!("undefined builtin {index}");
                    };
                    self.push(Value::Builtin(builtin))?;
                }
                Opcode::MakeClosure => {
                    let const_index = self.fetch_u16();
                    let num_free = self.fetch_u8();
                    self.make_closure(const_index, num_free)?;
                }
                Opcode::LoadFree => {
                    let index = self.fetch_u8();
                    let value = self.current_frame().closure.free[index].clone();
                    self.push(value)?;
                }
                Opcode::LoadCurrentClosure => {
                    let closure = Rc::clone(&self.current_frame().closure);
                    self.push(Value::Closure(closure))?;
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn execute_binary_operation(&mut self, op: Opcode) -> RunResult<()> {
        let right = self.pop();
        let left = self.pop();
        let result = match (&left, &right) {
            (Value::Integer(left), Value::Integer(right)) => {
                execute_integer_binary(op, *left, *right)?
            }
            (Value::Str(left), Value::Str(right)) => {
                if op != Opcode::BinaryAdd {
                    return runtime_err!("unknown string operator: {}", op.mnemonic());
                }
                let mut concatenated = String::with_capacity(left.len() + right.len());
                concatenated.push_str(left);
                concatenated.push_str(right);
                Value::Str(Rc::from(concatenated))
            }
            _ => {
                return runtime_err!(
                    "unsupported types for binary operation: {} {}",
                    left.type_tag(),
                    right.type_tag()
                )
            }
        };
        self.push(result)
    }

    fn execute_comparison(&mut self, op: Opcode) -> RunResult<()> {
        let right = self.pop();
        let left = self.pop();
        let result = match (&left, &right) {
            (Value::Integer(left), Value::Integer(right)) => match op {
                Opcode::CompareEq => left == right,
                Opcode::CompareNe => left != right,
                Opcode::CompareGt => left > right,
                _ => unreachable!("execute_comparison called for {}", op.mnemonic()),
            },
            // Non-integer comparison is equality only, and only between
            // values of the same runtime type.
            _ if left.type_tag() == right.type_tag() && op != Opcode::CompareGt => match op {
                Opcode::CompareEq => left == right,
                Opcode::CompareNe => left != right,
                _ => unreachable!("execute_comparison called for {}", op.mnemonic()),
            },
            _ => {
                return runtime_err!(
                    "unknown operator: {} ({} {})",
                    op.mnemonic(),
                    left.type_tag(),
                    right.type_tag()
                )
            }
        };
        self.push(Value::Boolean(result))
    }

    fn build_hash(&self, start: usize, end: usize) -> RunResult<Value> {
        let mut pairs = IndexMap::with_capacity((end - start) / 2);
        for slot in (start..end).step_by(2) {
            let key = self.stack[slot].clone();
            let value = self.stack[slot + 1].clone();
            let Some(hash_key) = key.hash_key() else {
                return runtime_err!("unusable as hash key: {}", key.type_tag());
            };
            // Duplicate keys keep the last occurrence.
            pairs.insert(hash_key, HashPair { key, value });
        }
        Ok(Value::Hash(Rc::new(pairs)))
    }

    fn execute_call(&mut self, num_args: usize) -> RunResult<()> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Value::Closure(closure) => self.call_closure(&closure, num_args),
            Value::Builtin(builtin) => self.call_builtin(builtin, num_args),
            _ => runtime_err!("calling non-closure and non-builtin"),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, num_args: usize) -> RunResult<()> {
        let function = &closure.function;
        if num_args != function.num_parameters {
            return runtime_err!(
                "wrong number of arguments: want={}, got={}",
                function.num_parameters,
                num_args
            );
        }
        if self.frames.len() >= MAX_FRAMES {
            return runtime_err!("stack overflow");
        }
        let base_pointer = self.sp - num_args;
        if base_pointer + function.num_locals >= STACK_SIZE {
            return runtime_err!("stack overflow");
        }
        // Locals occupy [base_pointer, base_pointer + num_locals); arguments
        // are already in place as the first locals.
        self.sp = base_pointer + function.num_locals;
        self.frames.push(Frame::new(Rc::clone(closure), base_pointer));
        Ok(())
    }

    fn call_builtin(&mut self, builtin: Builtin, num_args: usize) -> RunResult<()> {
        let args = self.stack[self.sp - num_args..self.sp].to_vec();
        let result = builtin.call(&args, self.output)?;
        self.sp -= num_args + 1;
        self.push(result)
    }

    fn make_closure(&mut self, const_index: usize, num_free: usize) -> RunResult<()> {
        let Value::CompiledFunction(function) = self.constants[const_index].clone() else {
            return runtime_err!("not a function: {}", self.constants[const_index].type_tag());
        };
        let free = self.stack[self.sp - num_free..self.sp].to_vec();
        self.sp -= num_free;
        self.push(Value::Closure(Rc::new(Closure { function, free })))
    }

    // ========================================================================
    // Fetch and stack primitives
    // ========================================================================

    fn fetch_u16(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let value = read_u16(&frame.closure.function.instructions.bytes()[frame.ip..]);
        frame.ip += 2;
        value as usize
    }

    fn fetch_u8(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let value = frame.closure.function.instructions.bytes()[frame.ip];
        frame.ip += 1;
        value as usize
    }

    fn push(&mut self, value: Value) -> RunResult<()> {
        if self.sp >= STACK_SIZE {
            return runtime_err!("stack overflow");
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    /// Decrements the stack pointer; the slot keeps its value so
    /// [`Vm::last_popped`] can observe it.
    fn pop(&mut self) -> Value {
        self.sp -= 1;
        self.stack[self.sp].clone()
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("frame stack is never empty")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is never empty")
    }
}

fn execute_integer_binary(op: Opcode, left: i64, right: i64) -> RunResult<Value> {
    let result = match op {
        Opcode::BinaryAdd => left.wrapping_add(right),
        Opcode::BinarySub => left.wrapping_sub(right),
        Opcode::BinaryMul => left.wrapping_mul(right),
        Opcode::BinaryDiv => {
            if right == 0 {
                return runtime_err!("division by zero");
            }
            left.wrapping_div(right)
        }
        _ => return runtime_err!("unknown integer operator: {}", op.mnemonic()),
    };
    Ok(Value::Integer(result))
}

fn execute_index(left: &Value, index: &Value) -> RunResult<Value> {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            let value = usize::try_from(*i)
                .ok()
                .and_then(|i| elements.get(i).cloned())
                .unwrap_or(Value::Null);
            Ok(value)
        }
        (Value::Hash(pairs), key) => {
            let Some(hash_key) = key.hash_key() else {
                return runtime_err!("unusable as hash key: {}", key.type_tag());
            };
            Ok(pairs
                .get(&hash_key)
                .map_or(Value::Null, |pair| pair.value.clone()))
        }
        _ => runtime_err!("index operator not supported: {}", left.type_tag()),
    }
}
