//! Single-pass Pratt-parsing compiler: walks the token stream once, emitting
//! bytecode directly into the function currently being compiled with no
//! intermediate AST.

mod rules;

use crate::chunk::{Chunk, OpCode};
use crate::gc::object::LoxFunction;
use crate::gc::Gc;
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::{FunctionId, Value};
use rules::{get_rule, ParseFn, Precedence};
use std::io::Write;

const MAX_LOCALS: usize = 256;
const MAX_UPVALUES: usize = 256;
const MAX_PARAMS: usize = 255;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Script,
    Function,
}

struct Local<'src> {
    name: &'src str,
    /// -1 means "declared but not yet initialized": the name is in scope
    /// for shadowing purposes but reading it is a compile error, which is
    /// exactly how `var a = a;` is rejected.
    depth: i32,
    is_captured: bool,
}

#[derive(Clone, Copy)]
struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

struct Frame<'src> {
    function: LoxFunction,
    function_type: FunctionType,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: i32,
}

impl<'src> Frame<'src> {
    fn new(function_type: FunctionType) -> Self {
        // Slot 0 is reserved for the callee itself, named "" so user code
        // can never shadow it by declaring a local called "".
        let locals = vec![Local {
            name: "",
            depth: 0,
            is_captured: false,
        }];
        Frame {
            function: LoxFunction::new(),
            function_type,
            locals,
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

pub struct Parser<'src, 'gc, 'err> {
    scanner: Scanner<'src>,
    gc: &'gc mut Gc,
    err: &'err mut dyn Write,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    frames: Vec<Frame<'src>>,
}

/// Compile `source` into a top-level script function. Returns `Err(())` if
/// any compile error was reported (diagnostics are written to `err` as
/// they're found, matching clox's immediate-report-then-keep-parsing
/// behavior).
pub fn compile(source: &str, gc: &mut Gc, err: &mut dyn Write) -> Result<FunctionId, ()> {
    let mut parser = Parser {
        scanner: Scanner::new(source),
        gc,
        err,
        current: Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 0,
        },
        previous: Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 0,
        },
        had_error: false,
        panic_mode: false,
        frames: vec![Frame::new(FunctionType::Script)],
    };

    parser.advance();
    while !parser.check(TokenKind::Eof) {
        parser.declaration();
    }
    parser.consume(TokenKind::Eof, "Expect end of expression.");

    let (function, _upvalues) = parser.end_compiler();
    if parser.had_error {
        Err(())
    } else {
        Ok(parser.gc.alloc_function(function))
    }
}

impl<'src, 'gc, 'err> Parser<'src, 'gc, 'err> {
    fn frame(&mut self) -> &mut Frame<'src> {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.frame().function.chunk
    }

    /// Every value a collection run mid-compile must not sweep out from under
    /// us: each in-progress function's own name plus the constants already
    /// embedded in its chunk, for every frame on the compiler's frame chain
    /// (not just the innermost one — an outer function's chunk is just as
    /// live while a nested one is being compiled), plus whatever the caller
    /// just allocated but hasn't rooted anywhere else yet.
    fn compiler_roots(&self, extra: &[Value]) -> Vec<Value> {
        let mut roots = Vec::new();
        for frame in &self.frames {
            if let Some(name) = frame.function.name {
                roots.push(Value::string(name));
            }
            roots.extend(frame.function.chunk.constants.iter().copied());
        }
        roots.extend_from_slice(extra);
        roots
    }

    /// Check the heap's growth threshold at an allocation point and collect
    /// if it's been crossed, rooting from the compiler's own frame chain
    /// instead of a VM stack (there isn't one yet — this runs before the VM
    /// exists). `extra` roots whatever was just allocated by the caller but
    /// isn't reachable from `self.frames` yet (e.g. a freshly interned name
    /// that hasn't been embedded as a constant).
    fn collect_garbage_if_needed(&mut self, extra: &[Value]) {
        if self.gc.should_collect() {
            let roots = self.compiler_roots(extra);
            self.gc.collect(roots, Vec::new());
        }
    }

    // ----- token stream -------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let mut line = format!("[line {}] Error", token.line);
        if token.kind == TokenKind::Eof {
            line.push_str(" at end");
        } else if token.kind != TokenKind::Error {
            line.push_str(&format!(" at '{}'", token.lexeme));
        }
        line.push_str(&format!(": {message}"));
        let _ = writeln!(self.err, "{line}");
        self.had_error = true;
    }

    /// Skip tokens until a likely statement boundary, so one syntax error
    /// doesn't cascade into a wall of spurious follow-on errors.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Else
                | TokenKind::Fun
                | TokenKind::If
                | TokenKind::Nil
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Var
                | TokenKind::While
                | TokenKind::For => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ----- bytecode emission --------------------------------------------

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.chunk().write_op(op, line);
    }

    fn emit_bytes(&mut self, op: OpCode, byte: u8) {
        self.emit_op(op);
        self.emit_byte(byte);
    }

    fn emit_constant(&mut self, value: Value) {
        match self.chunk().add_constant(value) {
            Some(index) => self.emit_bytes(OpCode::Constant, index),
            None => self.error("Too many constants in one chunk."),
        }
    }

    /// Emit a jump opcode with a placeholder 2-byte operand, returning the
    /// operand's offset so the caller can [`Parser::patch_jump`] it once the
    /// real distance is known.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk().code_len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.chunk().code_len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        let chunk = self.chunk();
        chunk.code[offset] = ((jump >> 8) & 0xff) as u8;
        chunk.code[offset + 1] = (jump & 0xff) as u8;
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.chunk().code_len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn emit_return(&mut self) {
        self.emit_op(OpCode::Nil);
        self.emit_op(OpCode::Return);
    }

    fn end_compiler(&mut self) -> (LoxFunction, Vec<UpvalueDesc>) {
        self.emit_return();
        let frame = self.frames.pop().expect("frame stack is never empty");
        #[cfg(feature = "print_code")]
        {
            let name = frame
                .function
                .name
                .map(|id| self.gc.string(id).to_string())
                .unwrap_or_else(|| "<script>".to_string());
            crate::debug::disassemble_chunk(&frame.function.chunk, &name, &*self.gc);
        }
        (frame.function, frame.upvalues)
    }

    // ----- scope / locals -------------------------------------------------

    fn begin_scope(&mut self) {
        self.frame().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.frame().scope_depth -= 1;
        let depth = self.frame().scope_depth;
        while let Some(local) = self.frame().locals.last() {
            if local.depth <= depth {
                break;
            }
            if self.frame().locals.last().unwrap().is_captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
            self.frame().locals.pop();
        }
    }

    fn declare_variable(&mut self) {
        if self.frame().scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = self.frame().scope_depth;
        for local in self.frame().locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name {
                self.error("Already a variable with this name in this scope.");
                return;
            }
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.frame().locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.frame().locals.push(Local {
            name,
            depth: -1,
            is_captured: false,
        });
    }

    fn mark_initialized(&mut self) {
        if self.frame().scope_depth == 0 {
            return;
        }
        let depth = self.frame().scope_depth;
        self.frame().locals.last_mut().unwrap().depth = depth;
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.frame().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let id = self.gc.intern(name);
        self.collect_garbage_if_needed(&[Value::string(id)]);
        self.chunk()
            .add_constant(Value::string(id))
            .unwrap_or_else(|| {
                self.error("Too many constants in one chunk.");
                0
            })
    }

    fn define_variable(&mut self, global: u8) {
        if self.frame().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_bytes(OpCode::DefineGlobal, global);
    }

    /// Mirrors clox's `resolveLocal`: the error for reading a local inside
    /// its own initializer is reported right here, not by the caller, since
    /// both `named_variable` and `resolve_upvalue` route through this.
    fn resolve_local(&mut self, frame_index: usize, name: &str) -> Option<u8> {
        let slot = self.frames[frame_index]
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(i, local)| (i as u8, local.depth));
        match slot {
            Some((i, -1)) => {
                self.error("Can't read local variable in its own initializer.");
                Some(i)
            }
            Some((i, _)) => Some(i),
            None => None,
        }
    }

    /// Resolve `name` as an upvalue of `frame_index`, recursing outward
    /// through enclosing frames and threading a fresh upvalue slot into
    /// every intervening function so a doubly-nested closure can still
    /// reach a variable two scopes up.
    fn resolve_upvalue(&mut self, frame_index: usize, name: &str) -> Option<u8> {
        if frame_index == 0 {
            return None;
        }
        let enclosing = frame_index - 1;
        if let Some(local) = self.resolve_local(enclosing, name) {
            self.frames[enclosing].locals[local as usize].is_captured = true;
            return Some(self.add_upvalue(frame_index, local, true));
        }
        if let Some(upvalue) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(frame_index, upvalue, false));
        }
        None
    }

    fn add_upvalue(&mut self, frame_index: usize, index: u8, is_local: bool) -> u8 {
        let frame = &mut self.frames[frame_index];
        for (i, up) in frame.upvalues.iter().enumerate() {
            if up.index == index && up.is_local == is_local {
                return i as u8;
            }
        }
        if frame.upvalues.len() >= MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        frame.upvalues.push(UpvalueDesc { index, is_local });
        frame.function.upvalue_count = frame.upvalues.len() as u8;
        (frame.upvalues.len() - 1) as u8
    }

    // ----- declarations / statements --------------------------------------

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    fn function(&mut self, function_type: FunctionType) {
        let name = self.gc.intern(self.previous.lexeme);
        self.collect_garbage_if_needed(&[Value::string(name)]);
        self.frames.push(Frame::new(function_type));
        self.frame().function.name = Some(name);

        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.frame().function.arity as usize >= MAX_PARAMS {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                self.frame().function.arity += 1;
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let (function, upvalue_descs) = self.end_compiler();

        let function_id = self.gc.alloc_function(function);
        self.collect_garbage_if_needed(&[Value::function(function_id)]);
        self.emit_bytes(OpCode::Closure, 0);
        let const_index = self
            .chunk()
            .add_constant(Value::function(function_id))
            .unwrap_or_else(|| {
                self.error("Too many constants in one chunk.");
                0
            });
        // patch the placeholder operand we just emitted
        let code_len = self.chunk().code_len();
        self.chunk().code[code_len - 1] = const_index;

        for upvalue in &upvalue_descs {
            self.emit_byte(upvalue.is_local as u8);
            self.emit_byte(upvalue.index);
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn return_statement(&mut self) {
        if self.frame().function_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().code_len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// Desugars into the equivalent `while` loop: no dedicated for-loop
    /// opcode exists, the increment clause is just compiled after the body
    /// and before the loop-back jump.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");

        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().code_len();
        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk().code_len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }

        self.end_scope();
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    // ----- expressions -----------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = get_rule(self.previous.kind).prefix;
        let Some(prefix) = prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        self.apply(prefix, can_assign);

        while precedence <= get_rule(self.current.kind).precedence {
            self.advance();
            let infix = get_rule(self.previous.kind)
                .infix
                .expect("infix rule must exist for any token accepted by the precedence loop");
            self.apply(infix, can_assign);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply(&mut self, f: ParseFn, can_assign: bool) {
        match f {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::And => self.and(),
            ParseFn::Or => self.or(),
            ParseFn::Call => self.call(),
        }
    }

    fn number(&mut self) {
        let value: f64 = self.previous.lexeme.parse().expect("scanner only emits valid number lexemes");
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let raw = self.previous.lexeme;
        let text = &raw[1..raw.len() - 1];
        let id = self.gc.intern(text);
        self.collect_garbage_if_needed(&[Value::string(id)]);
        self.emit_constant(Value::string(id));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => unreachable!("literal() only dispatched for false/true/nil"),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let kind = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match kind {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!("unary() only dispatched for -/!"),
        }
    }

    fn binary(&mut self) {
        let kind = self.previous.kind;
        let rule = get_rule(kind);
        self.parse_precedence(rule.precedence.next());
        match kind {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            _ => unreachable!("binary() only dispatched for arithmetic/comparison operators"),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let arg_count = self.argument_list();
        self.emit_bytes(OpCode::Call, arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count as u8
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous.lexeme, can_assign);
    }

    fn named_variable(&mut self, name: &'src str, can_assign: bool) {
        let frame_index = self.frames.len() - 1;
        let (get_op, set_op, slot) = if let Some(local) = self.resolve_local(frame_index, name) {
            (OpCode::GetLocal, OpCode::SetLocal, local)
        } else if let Some(upvalue) = self.resolve_upvalue(frame_index, name) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, upvalue)
        } else {
            let constant = self.identifier_constant(name);
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(set_op, slot);
        } else {
            self.emit_bytes(get_op, slot);
        }
    }
}
