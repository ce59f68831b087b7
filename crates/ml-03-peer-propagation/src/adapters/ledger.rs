use crate::ports::LocalHeadProvider;
use ml_02_ledger_store::LedgerStore;
use shared_types::HeadSnapshot;

impl LocalHeadProvider for LedgerStore {
    fn head_snapshot(&self) -> HeadSnapshot {
        self.snapshot()
    }
}
