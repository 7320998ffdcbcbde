//! Interceptor chains evaluated around EVM frames.
//!
//! Create interceptors gate contract deployment; call interceptors gate
//! calls and, through the precompile dispatchers, can take over a frame
//! entirely. Interceptors run in registration order and precompile dispatch
//! is just another call interceptor, not a special case.

use crate::{
    errors::{EngineError, VmError},
    evm::Frame,
};
use primitives::{Address, Bytes, HashMap, U256};
use statedb::StateDB;

/// Output of a precompile or any interceptor that handled a frame itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Return data, or the revert payload when `error` is a revert.
    pub ret: Bytes,
    /// Gas remaining after the handled frame.
    pub gas_left: u64,
    /// VM-level failure of the handled frame, if any.
    pub error: Option<VmError>,
}

impl PrecompileOutput {
    /// Successful output.
    pub fn ok(ret: Bytes, gas_left: u64) -> Self {
        Self {
            ret,
            gas_left,
            error: None,
        }
    }

    /// Reverted output carrying its payload.
    pub fn revert(ret: Bytes, gas_left: u64) -> Self {
        Self {
            ret,
            gas_left,
            error: Some(VmError::ExecutionReverted),
        }
    }
}

/// Decision of one call interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Not this interceptor's frame; evaluation continues.
    Continue,
    /// The interceptor executed the frame itself.
    Handled(PrecompileOutput),
}

/// Gate evaluated before a contract deployment.
///
/// Returning an error rejects the creation as a hard failure of the whole
/// message, not a VM error.
pub trait CreateInterceptor {
    fn intercept_create(
        &self,
        state: &mut StateDB<'_>,
        caller: Address,
        value: U256,
        init_code: &Bytes,
    ) -> Result<(), EngineError>;
}

/// Gate or handler evaluated before a call frame runs.
pub trait CallInterceptor {
    fn intercept_call(
        &self,
        state: &mut StateDB<'_>,
        frame: &Frame,
    ) -> Result<CallOutcome, EngineError>;
}

/// Ordered interceptor chains for one execution.
#[derive(Default)]
pub struct HookSet {
    create: Vec<Box<dyn CreateInterceptor>>,
    call: Vec<Box<dyn CallInterceptor>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a create interceptor; evaluation order is insertion order.
    pub fn push_create(&mut self, interceptor: Box<dyn CreateInterceptor>) -> &mut Self {
        self.create.push(interceptor);
        self
    }

    /// Appends a call interceptor; evaluation order is insertion order.
    pub fn push_call(&mut self, interceptor: Box<dyn CallInterceptor>) -> &mut Self {
        self.call.push(interceptor);
        self
    }

    pub(crate) fn create_interceptors(&self) -> &[Box<dyn CreateInterceptor>] {
        &self.create
    }

    pub(crate) fn call_interceptors(&self) -> &[Box<dyn CallInterceptor>] {
        &self.call
    }
}

impl core::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookSet")
            .field("create", &self.create.len())
            .field("call", &self.call.len())
            .finish()
    }
}

/// Create interceptor enforcing the module's deployment access control.
#[derive(Debug, Clone)]
pub struct CreateAccessControl {
    policy: crate::config::AccessControlType,
}

impl CreateAccessControl {
    pub fn new(policy: crate::config::AccessControlType) -> Self {
        Self { policy }
    }
}

impl CreateInterceptor for CreateAccessControl {
    fn intercept_create(
        &self,
        _state: &mut StateDB<'_>,
        caller: Address,
        _value: U256,
        _init_code: &Bytes,
    ) -> Result<(), EngineError> {
        if !self.policy.allows(caller) {
            return Err(EngineError::CreateNotAuthorized(caller));
        }
        Ok(())
    }
}

/// Call interceptor enforcing the module's call access control.
#[derive(Debug, Clone)]
pub struct CallAccessControl {
    policy: crate::config::AccessControlType,
}

impl CallAccessControl {
    pub fn new(policy: crate::config::AccessControlType) -> Self {
        Self { policy }
    }
}

impl CallInterceptor for CallAccessControl {
    fn intercept_call(
        &self,
        _state: &mut StateDB<'_>,
        frame: &Frame,
    ) -> Result<CallOutcome, EngineError> {
        if !self.policy.allows(frame.caller) {
            return Err(EngineError::CallNotAuthorized {
                caller: frame.caller,
                target: frame.recipient,
            });
        }
        Ok(CallOutcome::Continue)
    }
}

/// One precompiled contract. Business logic is external to this crate.
pub trait Precompile {
    fn run(
        &self,
        state: &mut StateDB<'_>,
        frame: &Frame,
    ) -> Result<PrecompileOutput, EngineError>;
}

/// Precompile dispatcher for normal execution: a fixed address set, each
/// frame targeting one of them is handled by the matching precompile.
#[derive(Default)]
pub struct StaticPrecompileSet {
    precompiles: HashMap<Address, Box<dyn Precompile>>,
}

impl StaticPrecompileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, precompile: Box<dyn Precompile>) {
        self.precompiles.insert(address, precompile);
    }

    /// Registered precompile addresses, sorted.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.precompiles.keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }
}

impl CallInterceptor for StaticPrecompileSet {
    fn intercept_call(
        &self,
        state: &mut StateDB<'_>,
        frame: &Frame,
    ) -> Result<CallOutcome, EngineError> {
        match self.precompiles.get(&frame.code_address) {
            Some(precompile) => Ok(CallOutcome::Handled(precompile.run(state, frame)?)),
            None => Ok(CallOutcome::Continue),
        }
    }
}

impl core::fmt::Debug for StaticPrecompileSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StaticPrecompileSet")
            .field("addresses", &self.addresses())
            .finish()
    }
}

/// Precompile dispatcher bound to a single recipient, used on state-override
/// paths so an overridden precompile set cannot leak into other executions.
pub struct RecipientPrecompile {
    address: Address,
    precompile: Box<dyn Precompile>,
}

impl RecipientPrecompile {
    pub fn new(address: Address, precompile: Box<dyn Precompile>) -> Self {
        Self {
            address,
            precompile,
        }
    }
}

impl CallInterceptor for RecipientPrecompile {
    fn intercept_call(
        &self,
        state: &mut StateDB<'_>,
        frame: &Frame,
    ) -> Result<CallOutcome, EngineError> {
        if frame.code_address != self.address {
            return Ok(CallOutcome::Continue);
        }
        Ok(CallOutcome::Handled(self.precompile.run(state, frame)?))
    }
}

impl core::fmt::Debug for RecipientPrecompile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecipientPrecompile")
            .field("address", &self.address)
            .finish()
    }
}

/// Hook set for one execution: access control for creates and calls per the
/// module params, plus the given precompile dispatcher as the final call
/// interceptor.
pub fn default_hook_set(
    params: &crate::config::Params,
    precompiles: StaticPrecompileSet,
) -> HookSet {
    let mut hooks = HookSet::new();
    hooks.push_create(Box::new(CreateAccessControl::new(
        params.access_control.create.clone(),
    )));
    hooks.push_call(Box::new(CallAccessControl::new(
        params.access_control.call.clone(),
    )));
    hooks.push_call(Box::new(precompiles));
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessControlType, AccessType};
    use primitives::address;
    use statedb::{InMemoryKeeper, TxConfig};

    const CALLER: Address = address!("0x0000000000000000000000000000000000000011");

    fn frame(code_address: Address) -> Frame {
        Frame {
            caller: CALLER,
            code_address,
            recipient: code_address,
            value: U256::ZERO,
            input: Bytes::new(),
            gas: 100_000,
            is_static: false,
            depth: 0,
        }
    }

    struct EchoPrecompile;

    impl Precompile for EchoPrecompile {
        fn run(
            &self,
            _state: &mut StateDB<'_>,
            frame: &Frame,
        ) -> Result<PrecompileOutput, EngineError> {
            Ok(PrecompileOutput::ok(frame.input.clone(), frame.gas))
        }
    }

    #[test]
    fn restricted_call_policy_rejects_everyone() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        let policy = AccessControlType {
            access_type: AccessType::Restricted,
            access_control_list: Vec::new(),
        };
        let interceptor = CallAccessControl::new(policy);
        let result = interceptor.intercept_call(&mut state, &frame(Address::ZERO));
        assert!(matches!(result, Err(EngineError::CallNotAuthorized { .. })));
    }

    #[test]
    fn static_set_dispatches_by_code_address() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        let precompile_addr = address!("0x0000000000000000000000000000000000000400");

        let mut set = StaticPrecompileSet::new();
        set.insert(precompile_addr, Box::new(EchoPrecompile));

        let outcome = set
            .intercept_call(&mut state, &frame(precompile_addr))
            .unwrap();
        assert!(matches!(outcome, CallOutcome::Handled(_)));

        let outcome = set
            .intercept_call(&mut state, &frame(Address::ZERO))
            .unwrap();
        assert_eq!(outcome, CallOutcome::Continue);
    }

    #[test]
    fn recipient_precompile_only_answers_its_address() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        let addr = address!("0x0000000000000000000000000000000000000800");
        let hook = RecipientPrecompile::new(addr, Box::new(EchoPrecompile));

        assert!(matches!(
            hook.intercept_call(&mut state, &frame(addr)).unwrap(),
            CallOutcome::Handled(_)
        ));
        assert_eq!(
            hook.intercept_call(&mut state, &frame(Address::ZERO))
                .unwrap(),
            CallOutcome::Continue
        );
    }
}
