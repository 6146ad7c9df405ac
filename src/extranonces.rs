use super::*;

#[derive(Debug)]
pub(crate) struct PoolExtranonces {
    enonce1_size: usize,
    enonce2_size: usize,
}

#[derive(Debug)]
pub(crate) struct ProxyExtranonces {
    upstream_enonce1: Extranonce,
    downstream_enonce2_size: usize,
    extension_size: usize,
}

#[derive(Debug)]
pub(crate) enum Extranonces {
    Pool(PoolExtranonces),
    Proxy(ProxyExtranonces),
}

impl PoolExtranonces {
    pub(crate) fn new(enonce1_size: usize, enonce2_size: usize) -> Result<Self> {
        ensure!(
            enonce1_size >= MIN_ENONCE_SIZE,
            "enonce1_size {} below minimum {}",
            enonce1_size,
            MIN_ENONCE_SIZE
        );
        ensure!(
            enonce1_size <= MAX_ENONCE_SIZE,
            "enonce1_size {} exceeds maximum {}",
            enonce1_size,
            MAX_ENONCE_SIZE
        );
        ensure!(
            enonce2_size >= MIN_ENONCE_SIZE,
            "enonce2_size {} below minimum {}",
            enonce2_size,
            MIN_ENONCE_SIZE
        );
        ensure!(
            enonce2_size <= MAX_ENONCE_SIZE,
            "enonce2_size {} exceeds maximum {}",
            enonce2_size,
            MAX_ENONCE_SIZE
        );

        Ok(Self {
            enonce1_size,
            enonce2_size,
        })
    }

    pub(crate) fn enonce1_size(&self) -> usize {
        self.enonce1_size
    }

    pub(crate) fn enonce2_size(&self) -> usize {
        self.enonce2_size
    }
}

impl ProxyExtranonces {
    pub(crate) fn new(
        upstream_enonce1: Extranonce,
        upstream_enonce2_size: usize,
        extension_size: usize,
    ) -> Result<Self> {
        let upstream_enonce1_size = upstream_enonce1.len();

        ensure!(
            upstream_enonce1_size >= MIN_ENONCE_SIZE,
            "upstream enonce1 size {} below minimum {}",
            upstream_enonce1_size,
            MIN_ENONCE_SIZE
        );
        ensure!(
            upstream_enonce1_size <= MAX_ENONCE_SIZE,
            "upstream enonce1 size {} exceeds maximum {}",
            upstream_enonce1_size,
            MAX_ENONCE_SIZE
        );

        let downstream_enonce2_size = upstream_enonce2_size
            .checked_sub(extension_size)
            .ok_or_else(|| {
                anyhow!(
                    "upstream enonce2_size {} too small to carve out {} byte extension",
                    upstream_enonce2_size,
                    extension_size
                )
            })?;

        ensure!(
            downstream_enonce2_size >= MIN_ENONCE_SIZE,
            "miner enonce2 space {} below minimum {} (upstream enonce2_size {} - extension {})",
            downstream_enonce2_size,
            MIN_ENONCE_SIZE,
            upstream_enonce2_size,
            extension_size
        );
        ensure!(
            downstream_enonce2_size <= MAX_ENONCE_SIZE,
            "miner enonce2 space {} exceeds maximum {}",
            downstream_enonce2_size,
            MAX_ENONCE_SIZE
        );

        Ok(Self {
            upstream_enonce1,
            downstream_enonce2_size,
            extension_size,
        })
    }

    pub(crate) fn upstream_enonce1(&self) -> &Extranonce {
        &self.upstream_enonce1
    }

    pub(crate) fn extension_size(&self) -> usize {
        self.extension_size
    }

    #[cfg(test)]
    pub(crate) fn extended_enonce1_size(&self) -> usize {
        self.upstream_enonce1.len() + self.extension_size
    }

    pub(crate) fn downstream_enonce2_size(&self) -> usize {
        self.downstream_enonce2_size
    }

    pub(crate) fn reconstruct_enonce2_for_upstream(
        &self,
        miner_enonce1: &Extranonce,
        miner_enonce2: &Extranonce,
    ) -> Extranonce {
        let upstream_enonce1_size = self.upstream_enonce1.len();
        let extension = &miner_enonce1.as_bytes()[upstream_enonce1_size..];

        let mut upstream_enonce2 = Vec::with_capacity(extension.len() + miner_enonce2.len());
        upstream_enonce2.extend_from_slice(extension);
        upstream_enonce2.extend_from_slice(miner_enonce2.as_bytes());

        Extranonce::from_bytes(&upstream_enonce2)
    }
}

impl Extranonces {
    #[cfg(test)]
    pub(crate) fn enonce1_size(&self) -> usize {
        match self {
            Extranonces::Pool(p) => p.enonce1_size(),
            Extranonces::Proxy(p) => p.extended_enonce1_size(),
        }
    }

    pub(crate) fn enonce2_size(&self) -> usize {
        match self {
            Extranonces::Pool(p) => p.enonce2_size(),
            Extranonces::Proxy(p) => p.downstream_enonce2_size(),
        }
    }
}
