//! Call and create frame execution.
//!
//! [`Evm`] owns the frame semantics the host chain is responsible for:
//! value transfer, hook interception, EIP-7702 delegation resolution,
//! snapshot/revert per frame, create-address derivation and code-deposit
//! rules. Opcode interpretation is delegated to the [`BytecodeExecutor`],
//! which may recurse into the same [`Evm`] for nested calls.

use crate::{
    context::BlockContext,
    errors::{EngineError, VmError},
    gas::CODE_DEPOSIT_GAS,
    hooks::{CallOutcome, HookSet},
};
use primitives::{
    constants::{MAX_CODE_SIZE, MAX_INITCODE_SIZE},
    parse_delegation, Address, Bytes, ForkRules, B256, KECCAK_EMPTY, U256,
};
use statedb::StateDB;

/// Maximum call/create nesting depth.
pub const CALL_DEPTH_LIMIT: usize = 1024;

/// One call or create frame about to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Caller of the frame.
    pub caller: Address,
    /// Address the executed code belongs to; differs from `recipient` after
    /// EIP-7702 delegation resolution.
    pub code_address: Address,
    /// Account whose storage and balance the frame acts on.
    pub recipient: Address,
    /// Value transferred into the frame.
    pub value: U256,
    /// Calldata. Empty for create frames, whose payload is the init code.
    pub input: Bytes,
    /// Gas available to the frame.
    pub gas: u64,
    /// Whether state mutation is forbidden.
    pub is_static: bool,
    /// Nesting depth, zero for the top-level frame.
    pub depth: usize,
}

/// Result of a finished frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResult {
    /// Return data, or the revert payload on revert.
    pub ret: Bytes,
    /// Gas remaining after the frame.
    pub gas_left: u64,
    /// VM-level failure, `None` on success.
    pub error: Option<VmError>,
}

impl FrameResult {
    /// Successful result.
    pub fn ok(ret: Bytes, gas_left: u64) -> Self {
        Self {
            ret,
            gas_left,
            error: None,
        }
    }

    /// Failed result.
    pub fn error(error: VmError, gas_left: u64) -> Self {
        Self {
            ret: Bytes::new(),
            gas_left,
            error: Some(error),
        }
    }

    /// Whether the frame ended in a plain revert.
    pub fn reverted(&self) -> bool {
        matches!(self.error, Some(VmError::ExecutionReverted))
    }
}

/// Bytecode interpreter boundary.
///
/// The engine hands a resolved frame and its code to the executor and gets
/// back output, remaining gas and an optional VM error. The executor calls
/// back into the [`Evm`] for state access and for nested frames.
pub trait BytecodeExecutor {
    fn execute(&self, evm: &mut Evm<'_, '_>, frame: &Frame, code: &Bytes) -> FrameResult;
}

/// Executes call and create frames over one [`StateDB`].
pub struct Evm<'a, 'k> {
    state: &'a mut StateDB<'k>,
    block: &'a BlockContext,
    rules: ForkRules,
    hooks: &'a HookSet,
    executor: &'a dyn BytecodeExecutor,
    depth: usize,
}

impl<'a, 'k> Evm<'a, 'k> {
    pub fn new(
        state: &'a mut StateDB<'k>,
        block: &'a BlockContext,
        rules: ForkRules,
        hooks: &'a HookSet,
        executor: &'a dyn BytecodeExecutor,
    ) -> Self {
        Self {
            state,
            block,
            rules,
            hooks,
            executor,
            depth: 0,
        }
    }

    /// The state this EVM executes against.
    pub fn state(&mut self) -> &mut StateDB<'k> {
        self.state
    }

    pub fn block(&self) -> &BlockContext {
        self.block
    }

    pub fn rules(&self) -> &ForkRules {
        &self.rules
    }

    /// Current frame nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Executes a message call.
    ///
    /// Runs the call interceptor chain first; an interceptor either rejects
    /// the call (hard error), handles the frame (precompiles), or lets it
    /// through to delegation resolution and the bytecode executor. The
    /// frame's state effects are reverted on any VM error.
    pub fn call(
        &mut self,
        caller: Address,
        recipient: Address,
        input: Bytes,
        gas: u64,
        value: U256,
        is_static: bool,
    ) -> Result<FrameResult, EngineError> {
        if self.depth > CALL_DEPTH_LIMIT {
            return Ok(FrameResult::error(VmError::CallDepthExceeded, gas));
        }
        if !value.is_zero() && self.state.balance(caller) < value {
            return Ok(FrameResult::error(VmError::InsufficientBalance, gas));
        }

        let snapshot = self.state.snapshot();
        self.state.sub_balance(caller, value);
        self.state.add_balance(recipient, value);

        // Delegation resolution happens before interception so a precompile
        // behind a delegation designator still dispatches on its address.
        let mut code_address = recipient;
        let mut code = self.state.code(recipient);
        if self.rules.is_prague {
            if let Some(target) = parse_delegation(&code) {
                code_address = target;
                code = self.state.code(target);
            }
        }

        let frame = Frame {
            caller,
            code_address,
            recipient,
            value,
            input,
            gas,
            is_static,
            depth: self.depth,
        };

        for interceptor in self.hooks.call_interceptors() {
            match interceptor.intercept_call(self.state, &frame) {
                Ok(CallOutcome::Continue) => {}
                Ok(CallOutcome::Handled(output)) => {
                    let result = FrameResult {
                        ret: output.ret,
                        gas_left: output.gas_left,
                        error: output.error,
                    };
                    return Ok(self.finish_frame(result, snapshot));
                }
                Err(err) => {
                    self.state.revert_to_snapshot(snapshot);
                    return Err(err);
                }
            }
        }

        if code.is_empty() {
            return Ok(FrameResult::ok(Bytes::new(), gas));
        }

        self.depth += 1;
        let result = self.executor.execute(self, &frame, &code);
        self.depth -= 1;
        Ok(self.finish_frame(result, snapshot))
    }

    /// Executes a contract creation, returning the result and the derived
    /// contract address.
    pub fn create(
        &mut self,
        caller: Address,
        value: U256,
        init_code: &Bytes,
        gas: u64,
    ) -> Result<(FrameResult, Address), EngineError> {
        for interceptor in self.hooks.create_interceptors() {
            interceptor.intercept_create(self.state, caller, value, init_code)?;
        }

        let nonce = self.state.nonce(caller);
        let contract_address = caller.create(nonce);

        if self.depth > CALL_DEPTH_LIMIT {
            return Ok((
                FrameResult::error(VmError::CallDepthExceeded, gas),
                contract_address,
            ));
        }
        if self.rules.is_shanghai && init_code.len() > MAX_INITCODE_SIZE {
            return Ok((
                FrameResult::error(VmError::MaxInitCodeSizeExceeded, gas),
                contract_address,
            ));
        }
        if !value.is_zero() && self.state.balance(caller) < value {
            return Ok((
                FrameResult::error(VmError::InsufficientBalance, gas),
                contract_address,
            ));
        }
        if nonce == u64::MAX {
            return Ok((
                FrameResult::error(VmError::NonceOverflow, gas),
                contract_address,
            ));
        }
        self.state.set_nonce(caller, nonce + 1);

        if self.rules.is_berlin {
            self.state.add_address_to_access_list(contract_address);
        }

        // Collision: the target must hold no nonce and no code. A collision
        // consumes all gas.
        let existing_hash = self.state.code_hash(contract_address);
        if self.state.nonce(contract_address) != 0
            || !(existing_hash == B256::ZERO || existing_hash == KECCAK_EMPTY)
        {
            return Ok((
                FrameResult::error(VmError::ContractAddressCollision, 0),
                contract_address,
            ));
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(contract_address);
        self.state.create_contract(contract_address);
        self.state.set_nonce(contract_address, 1);
        self.state.sub_balance(caller, value);
        self.state.add_balance(contract_address, value);

        let frame = Frame {
            caller,
            code_address: contract_address,
            recipient: contract_address,
            value,
            input: Bytes::new(),
            gas,
            is_static: false,
            depth: self.depth,
        };

        self.depth += 1;
        let mut result = self.executor.execute(self, &frame, init_code);
        self.depth -= 1;

        if result.error.is_none() {
            result = self.deposit_code(contract_address, result);
        }
        Ok((self.finish_frame(result, snapshot), contract_address))
    }

    /// Applies the code-deposit rules of EIP-3541/170 and charges the
    /// per-byte deposit cost.
    fn deposit_code(&mut self, address: Address, mut result: FrameResult) -> FrameResult {
        let code = result.ret.clone();
        if self.rules.is_london && code.first() == Some(&0xef) {
            return FrameResult::error(VmError::InvalidCode, 0);
        }
        if code.len() > MAX_CODE_SIZE {
            return FrameResult::error(VmError::MaxCodeSizeExceeded, 0);
        }
        let deposit_gas = code.len() as u64 * CODE_DEPOSIT_GAS;
        if result.gas_left < deposit_gas {
            return FrameResult::error(VmError::CodeStoreOutOfGas, 0);
        }
        result.gas_left -= deposit_gas;
        self.state.set_code(address, code);
        result
    }

    /// Reverts the frame's snapshot on error and zeroes remaining gas for
    /// every failure that is not a plain revert.
    fn finish_frame(&mut self, mut result: FrameResult, snapshot: usize) -> FrameResult {
        if result.error.is_some() {
            self.state.revert_to_snapshot(snapshot);
            if !result.reverted() {
                result.gas_left = 0;
            }
        }
        result
    }
}
