mod sync_cycle;
