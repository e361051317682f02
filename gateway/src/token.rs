//! The fungible token interface the gateways orchestrate, and an in-memory token ledger implementing it.

use std::collections::HashMap;

use alloy::primitives::Address;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("{account} holds {balance} tokens, needs {needed}")]
    InsufficientBalance {
        account: Address,
        balance: u128,
        needed: u128,
    },
    #[error("{spender} may spend {allowance} of {owner}'s tokens, needs {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: u128,
        needed: u128,
    },
    #[error("{0} is not allowed to mint or burn")]
    NotMinter(Address),
    #[error("token supply overflow")]
    Overflow,
}

pub trait Eip20Token {
    fn address(&self) -> Address;

    fn balance_of(&self, owner: Address) -> u128;

    fn allowance(&self, owner: Address, spender: Address) -> u128;

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError>;

    /// Moves `amount` of `from`'s tokens, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<(), TokenError>;
}

/// A token whose supply is controlled by a gateway.
pub trait UtilityToken: Eip20Token {
    fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError>;

    fn burn(&mut self, caller: Address, from: Address, amount: u128) -> Result<(), TokenError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryToken {
    address: Address,
    minter: Option<Address>,
    total_supply: u128,
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl MemoryToken {
    /// A token with a fixed supply. Minting and burning always fail.
    pub fn new(address: Address) -> Self {
        MemoryToken {
            address,
            ..Default::default()
        }
    }

    pub fn with_minter(address: Address, minter: Address) -> Self {
        MemoryToken {
            address,
            minter: Some(minter),
            ..Default::default()
        }
    }

    /// Genesis allocation.
    pub fn with_balance(mut self, owner: Address, amount: u128) -> Self {
        *self.balances.entry(owner).or_default() += amount;
        self.total_supply += amount;
        self
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn debit(&mut self, account: Address, amount: u128) -> Result<(), TokenError> {
        let balance = self.balance_of(account);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                account,
                balance,
                needed: amount,
            })?;
        self.balances.insert(account, remaining);
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: u128) -> Result<(), TokenError> {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    fn check_minter(&self, caller: Address) -> Result<(), TokenError> {
        match self.minter {
            Some(minter) if minter == caller => Ok(()),
            _ => Err(TokenError::NotMinter(caller)),
        }
    }
}

impl Eip20Token for MemoryToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, owner: Address) -> u128 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientAllowance {
                owner: from,
                spender,
                allowance,
                needed: amount,
            })?;
        self.transfer(from, to, amount)?;
        self.allowances.insert((from, spender), remaining);
        Ok(())
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<(), TokenError> {
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }
}

impl UtilityToken for MemoryToken {
    fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.check_minter(caller)?;
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.credit(to, amount)
    }

    fn burn(&mut self, caller: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        self.check_minter(caller)?;
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }
}
