//! Counter name tables of the supported products.
//!
//! The driver exposes counters as 64 consecutive `u32` per block. Names are
//! `<product>_<counter>`, e.g. `TMIx_GPU_ACTIVE`; products of one
//! generation share the position of each counter, so tables are stored as a
//! sparse layout per generation plus the product prefix. Unlisted positions
//! are reserved or unnamed.

use super::Block;

/// Number of counters in one block.
pub const BLOCK_COUNTERS: usize = 64;

type Layout = [&'static [(u8, &'static str)]; 4];

/// Names of one product's counters.
#[derive(Debug)]
pub struct NameTable {
    prefix: &'static str,
    layout: &'static Layout,
}

impl NameTable {
    const fn new(prefix: &'static str, layout: &'static Layout) -> Self {
        Self { prefix, layout }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Index of the first counter in `block` whose full name contains `needle`.
    pub fn find(&self, block: Block, needle: &str) -> Option<usize> {
        self.layout[block as usize]
            .iter()
            .find(|(_, suffix)| self.full_name(suffix).contains(needle))
            .map(|&(index, _)| index as usize)
    }

    /// Full name of counter `index` in `block`.
    pub fn name(&self, block: Block, index: usize) -> Option<String> {
        self.layout[block as usize]
            .iter()
            .find(|&&(i, _)| i as usize == index)
            .map(|(_, suffix)| self.full_name(suffix))
    }

    fn full_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }
}

pub static T60X: NameTable = NameTable::new("T60x", &MIDGARD);
pub static T62X: NameTable = NameTable::new("T62x", &MIDGARD);
pub static T72X: NameTable = NameTable::new("T72x", &MIDGARD);
pub static T76X: NameTable = NameTable::new("T76x", &MIDGARD);
pub static T82X: NameTable = NameTable::new("T82x", &MIDGARD);
pub static T83X: NameTable = NameTable::new("T83x", &MIDGARD);
pub static T86X: NameTable = NameTable::new("T86x", &MIDGARD);
pub static T88X: NameTable = NameTable::new("T88x", &MIDGARD);
pub static TMIX: NameTable = NameTable::new("TMIx", &TMIX_LAYOUT);
pub static THEX: NameTable = NameTable::new("THEx", &BIFROST);
pub static TSIX: NameTable = NameTable::new("TSIx", &BIFROST);
pub static TNOX: NameTable = NameTable::new("TNOx", &BIFROST);
pub static TGOX: NameTable = NameTable::new("TGOx", &BIFROST);
pub static TDVX: NameTable = NameTable::new("TDVx", &BIFROST);

static MIDGARD: Layout = [JM, MIDGARD_TILER, MIDGARD_SHADER, MIDGARD_MMU_L2];
static TMIX_LAYOUT: Layout = [JM, BIFROST_TILER, TMIX_SHADER, BIFROST_MMU_L2];
static BIFROST: Layout = [JM, BIFROST_TILER, BIFROST_SHADER, BIFROST_MMU_L2];

#[rustfmt::skip]
const JM: &[(u8, &str)] = &[
    (4, "MESSAGES_SENT"), (5, "MESSAGES_RECEIVED"),
    (6, "GPU_ACTIVE"), (7, "IRQ_ACTIVE"),
    (8, "JS0_JOBS"), (9, "JS0_TASKS"), (10, "JS0_ACTIVE"),
    (12, "JS0_WAIT_READ"), (13, "JS0_WAIT_ISSUE"), (14, "JS0_WAIT_DEPEND"), (15, "JS0_WAIT_FINISH"),
    (16, "JS1_JOBS"), (17, "JS1_TASKS"), (18, "JS1_ACTIVE"),
    (20, "JS1_WAIT_READ"), (21, "JS1_WAIT_ISSUE"), (22, "JS1_WAIT_DEPEND"), (23, "JS1_WAIT_FINISH"),
    (24, "JS2_JOBS"), (25, "JS2_TASKS"), (26, "JS2_ACTIVE"),
    (28, "JS2_WAIT_READ"), (29, "JS2_WAIT_ISSUE"), (30, "JS2_WAIT_DEPEND"), (31, "JS2_WAIT_FINISH"),
];

#[rustfmt::skip]
const MIDGARD_TILER: &[(u8, &str)] = &[
    (3, "JOBS_PROCESSED"), (4, "TRIANGLES"), (5, "QUADS"), (6, "POLYGONS"), (7, "POINTS"),
    (8, "LINES"), (9, "VCACHE_HIT"), (10, "VCACHE_MISS"), (11, "FRONT_FACING"),
    (12, "BACK_FACING"), (13, "PRIM_VISIBLE"), (14, "PRIM_CULLED"), (15, "PRIM_CLIPPED"),
    (16, "LEVEL0"), (17, "LEVEL1"), (18, "LEVEL2"), (19, "LEVEL3"), (20, "LEVEL4"),
    (21, "LEVEL5"), (22, "LEVEL6"), (23, "LEVEL7"),
    (45, "TI_ACTIVE"),
];

#[rustfmt::skip]
const BIFROST_TILER: &[(u8, &str)] = &[
    (4, "TILER_ACTIVE"), (5, "JOBS_PROCESSED"), (6, "TRIANGLES"), (7, "LINES"), (8, "POINTS"),
    (9, "FRONT_FACING"), (10, "BACK_FACING"), (11, "PRIM_VISIBLE"), (12, "PRIM_CULLED"),
    (13, "PRIM_CLIPPED"), (14, "PRIM_SAT_CULLED"), (17, "BUS_READ"), (19, "BUS_WRITE"),
    (20, "LOADING_DESC"), (21, "IDVS_POS_SHAD_REQ"), (22, "IDVS_POS_SHAD_WAIT"),
    (23, "IDVS_POS_SHAD_STALL"), (24, "IDVS_POS_FIFO_FULL"), (25, "PREFETCH_STALL"),
    (26, "VCACHE_HIT"), (27, "VCACHE_MISS"), (28, "VCACHE_LINE_WAIT"),
    (29, "VFETCH_POS_READ_WAIT"), (30, "VFETCH_VERTEX_WAIT"), (31, "VFETCH_STALL"),
    (32, "PRIMASSY_STALL"), (33, "BBOX_GEN_STALL"), (40, "PRIMASSY_POS_SHADER_WAIT"),
    (41, "PRIMASSY_POS_SHADER_STALL"), (52, "IDVS_VBU_HIT"), (53, "IDVS_VBU_MISS"),
    (55, "IDVS_VAR_SHAD_REQ"), (56, "IDVS_VAR_SHAD_STALL"), (57, "BINNER_STALL"),
    (58, "ITER_STALL"), (59, "COMPRESS_MISS"), (60, "COMPRESS_STALL"),
    (61, "PCACHE_HIT"), (62, "PCACHE_MISS"),
];

#[rustfmt::skip]
const MIDGARD_SHADER: &[(u8, &str)] = &[
    (4, "FRAG_ACTIVE"), (5, "FRAG_PRIMITIVES"), (6, "FRAG_PRIMITIVES_DROPPED"),
    (7, "FRAG_CYCLES_DESC"), (8, "FRAG_CYCLES_PLR"), (9, "FRAG_CYCLES_VERT"),
    (10, "FRAG_CYCLES_TRISETUP"), (11, "FRAG_CYCLES_RAST"), (12, "FRAG_THREADS"),
    (13, "FRAG_DUMMY_THREADS"), (14, "FRAG_QUADS_RAST"), (15, "FRAG_QUADS_EZS_TEST"),
    (16, "FRAG_QUADS_EZS_KILLED"), (17, "FRAG_THREADS_LZS_TEST"), (18, "FRAG_THREADS_LZS_KILLED"),
    (19, "FRAG_CYCLES_NO_TILE"), (20, "FRAG_NUM_TILES"), (21, "FRAG_TRANS_ELIM"),
    (22, "COMPUTE_ACTIVE"), (23, "COMPUTE_TASKS"), (24, "COMPUTE_THREADS"),
    (25, "COMPUTE_CYCLES_DESC"), (26, "TRIPIPE_ACTIVE"), (27, "ARITH_WORDS"),
    (28, "ARITH_CYCLES_REG"), (29, "ARITH_CYCLES_L0"), (30, "ARITH_FRAG_DEPEND"),
    (31, "LS_WORDS"), (32, "LS_ISSUES"), (33, "LS_REISSUE_ATTR"), (34, "LS_REISSUES_VARY"),
    (35, "LS_VARY_RV_MISS"), (36, "LS_VARY_RV_HIT"), (37, "LS_NO_UNPARK"),
    (38, "TEX_WORDS"), (39, "TEX_BUBBLES"), (40, "TEX_WORDS_L0"), (41, "TEX_WORDS_DESC"),
    (42, "TEX_ISSUES"), (43, "TEX_RECIRC_FMISS"), (44, "TEX_RECIRC_DESC"),
    (45, "TEX_RECIRC_MULTI"), (46, "TEX_RECIRC_PMISS"), (47, "TEX_RECIRC_CONF"),
    (48, "LSC_READ_HITS"), (49, "LSC_READ_OP"), (50, "LSC_WRITE_HITS"), (51, "LSC_WRITE_OP"),
    (52, "LSC_ATOMIC_HITS"), (53, "LSC_ATOMIC_OP"), (54, "LSC_LINE_FETCHES"),
    (55, "LSC_DIRTY_LINE"), (56, "LSC_SNOOPS"), (57, "AXI_TLB_STALL"), (58, "AXI_TLB_MISS"),
    (59, "AXI_TLB_TRANSACTION"), (60, "LS_TLB_MISS"), (61, "LS_TLB_HIT"),
    (62, "AXI_BEATS_READ"), (63, "AXI_BEATS_WRITTEN"),
];

#[rustfmt::skip]
const TMIX_SHADER: &[(u8, &str)] = &[
    (4, "FRAG_ACTIVE"), (5, "FRAG_PRIMITIVES"), (6, "FRAG_PRIM_RAST"), (7, "FRAG_FPK_ACTIVE"),
    (8, "FRAG_STARVING"), (9, "FRAG_WARPS"), (10, "FRAG_PARTIAL_WARPS"), (11, "FRAG_QUADS_RAST"),
    (12, "FRAG_QUADS_EZS_TEST"), (13, "FRAG_QUADS_EZS_UPDATE"), (14, "FRAG_QUADS_EZS_KILL"),
    (15, "FRAG_LZS_TEST"), (16, "FRAG_LZS_KILL"), (18, "FRAG_PTILES"), (19, "FRAG_TRANS_ELIM"),
    (20, "QUAD_FPK_KILLER"), (22, "COMPUTE_ACTIVE"), (23, "COMPUTE_TASKS"), (24, "COMPUTE_WARPS"),
    (25, "COMPUTE_STARVING"), (26, "EXEC_CORE_ACTIVE"), (27, "EXEC_ACTIVE"),
    (28, "EXEC_INSTR_COUNT"), (29, "EXEC_INSTR_DIVERGED"), (30, "EXEC_INSTR_STARVING"),
    (31, "ARITH_INSTR_SINGLE_FMA"), (32, "ARITH_INSTR_DOUBLE"), (33, "ARITH_INSTR_MSG"),
    (34, "ARITH_INSTR_MSG_ONLY"), (35, "TEX_INSTR"), (36, "TEX_INSTR_MIPMAP"),
    (37, "TEX_INSTR_COMPRESSED"), (38, "TEX_INSTR_3D"), (39, "TEX_INSTR_TRILINEAR"),
    (40, "TEX_COORD_ISSUE"), (41, "TEX_COORD_STALL"), (42, "TEX_STARVE_CACHE"),
    (43, "TEX_STARVE_FILTER"), (44, "LS_MEM_READ_FULL"), (45, "LS_MEM_READ_SHORT"),
    (46, "LS_MEM_WRITE_FULL"), (47, "LS_MEM_WRITE_SHORT"), (48, "LS_MEM_ATOMIC"),
    (49, "VARY_INSTR"), (50, "VARY_SLOT_32"), (51, "VARY_SLOT_16"), (52, "ATTR_INSTR"),
    (53, "ARITH_INSTR_FP_MUL"), (54, "BEATS_RD_FTC"), (55, "BEATS_RD_FTC_EXT"),
    (56, "BEATS_RD_LSC"), (57, "BEATS_RD_LSC_EXT"), (58, "BEATS_RD_TEX"),
    (59, "BEATS_RD_TEX_EXT"), (60, "BEATS_RD_OTHER"), (61, "BEATS_WR_LSC"), (62, "BEATS_WR_TIB"),
];

#[rustfmt::skip]
const BIFROST_SHADER: &[(u8, &str)] = &[
    (4, "FRAG_ACTIVE"), (5, "FRAG_PRIMITIVES"), (6, "FRAG_PRIM_RAST"), (7, "FRAG_FPK_ACTIVE"),
    (8, "FRAG_STARVING"), (9, "FRAG_WARPS"), (10, "FRAG_PARTIAL_WARPS"), (11, "FRAG_QUADS_RAST"),
    (12, "FRAG_QUADS_EZS_TEST"), (13, "FRAG_QUADS_EZS_UPDATE"), (14, "FRAG_QUADS_EZS_KILL"),
    (15, "FRAG_LZS_TEST"), (16, "FRAG_LZS_KILL"), (18, "FRAG_PTILES"), (19, "FRAG_TRANS_ELIM"),
    (20, "QUAD_FPK_KILLER"), (22, "COMPUTE_ACTIVE"), (23, "COMPUTE_TASKS"), (24, "COMPUTE_WARPS"),
    (25, "COMPUTE_STARVING"), (26, "EXEC_CORE_ACTIVE"), (27, "EXEC_ACTIVE"),
    (28, "EXEC_INSTR_COUNT"), (29, "EXEC_INSTR_DIVERGED"), (30, "EXEC_INSTR_STARVING"),
    (31, "ARITH_INSTR_SINGLE_FMA"), (32, "ARITH_INSTR_DOUBLE"), (33, "ARITH_INSTR_MSG"),
    (34, "ARITH_INSTR_MSG_ONLY"), (35, "TEX_MSGI_NUM_QUADS"), (36, "TEX_DFCH_NUM_PASSES"),
    (37, "TEX_DFCH_NUM_PASSES_MISS"), (38, "TEX_DFCH_NUM_PASSES_MIP_MAP"),
    (39, "TEX_TIDX_NUM_SPLIT_MIP_MAP"), (40, "TEX_TFCH_NUM_LINES_FETCHED"),
    (41, "TEX_TFCH_NUM_LINES_FETCHED_BLOCK"), (42, "TEX_TFCH_NUM_OPERATIONS"),
    (43, "TEX_FILT_NUM_OPERATIONS"), (44, "LS_MEM_READ_FULL"), (45, "LS_MEM_READ_SHORT"),
    (46, "LS_MEM_WRITE_FULL"), (47, "LS_MEM_WRITE_SHORT"), (48, "LS_MEM_ATOMIC"),
    (49, "VARY_INSTR"), (50, "VARY_SLOT_32"), (51, "VARY_SLOT_16"), (52, "ATTR_INSTR"),
    (53, "ARITH_INSTR_FP_MUL"), (54, "BEATS_RD_FTC"), (55, "BEATS_RD_FTC_EXT"),
    (56, "BEATS_RD_LSC"), (57, "BEATS_RD_LSC_EXT"), (58, "BEATS_RD_TEX"),
    (59, "BEATS_RD_TEX_EXT"), (60, "BEATS_RD_OTHER"), (61, "BEATS_WR_LSC"), (62, "BEATS_WR_TIB"),
];

#[rustfmt::skip]
const MIDGARD_MMU_L2: &[(u8, &str)] = &[
    (4, "MMU_HIT"), (5, "MMU_NEW_MISS"), (6, "MMU_REPLAY_FULL"), (7, "MMU_REPLAY_MISS"),
    (8, "MMU_TABLE_WALK"), (16, "UTLB_HIT"), (17, "UTLB_NEW_MISS"), (18, "UTLB_REPLAY_FULL"),
    (19, "UTLB_REPLAY_MISS"), (20, "UTLB_STALL"),
    (30, "L2_EXT_WRITE_BEATS"), (31, "L2_EXT_READ_BEATS"), (32, "L2_ANY_LOOKUP"),
    (33, "L2_READ_LOOKUP"), (34, "L2_SREAD_LOOKUP"), (35, "L2_READ_REPLAY"),
    (36, "L2_READ_SNOOP"), (37, "L2_READ_HIT"), (38, "L2_CLEAN_MISS"), (39, "L2_WRITE_LOOKUP"),
    (40, "L2_SWRITE_LOOKUP"), (41, "L2_WRITE_REPLAY"), (42, "L2_WRITE_SNOOP"),
    (43, "L2_WRITE_HIT"), (44, "L2_EXT_READ_FULL"), (45, "L2_EXT_READ_HALF"),
    (46, "L2_EXT_WRITE_FULL"), (47, "L2_EXT_WRITE_HALF"), (48, "L2_EXT_READ"),
    (49, "L2_EXT_READ_LINE"), (50, "L2_EXT_WRITE"), (51, "L2_EXT_WRITE_LINE"),
    (52, "L2_EXT_WRITE_SMALL"), (53, "L2_EXT_BARRIER"), (54, "L2_EXT_AR_STALL"),
    (55, "L2_EXT_R_BUF_FULL"), (56, "L2_EXT_RD_BUF_FULL"), (57, "L2_EXT_R_RAW"),
    (58, "L2_EXT_W_STALL"), (59, "L2_EXT_W_BUF_FULL"), (60, "L2_EXT_R_W_HAZARD"),
    (61, "L2_TAG_HAZARD"), (62, "L2_SNOOP_FULL"), (63, "L2_REPLAY_FULL"),
];

#[rustfmt::skip]
const BIFROST_MMU_L2: &[(u8, &str)] = &[
    (4, "MMU_REQUESTS"), (5, "MMU_TABLE_READS_L3"), (6, "MMU_TABLE_READS_L2"),
    (7, "MMU_HIT_L3"), (8, "MMU_HIT_L2"), (9, "MMU_S2_REQUESTS"), (10, "MMU_S2_TABLE_READS_L3"),
    (11, "MMU_S2_TABLE_READS_L2"), (12, "MMU_S2_HIT_L3"), (13, "MMU_S2_HIT_L2"),
    (16, "L2_RD_MSG_IN"), (17, "L2_RD_MSG_IN_STALL"), (18, "L2_WR_MSG_IN"),
    (19, "L2_WR_MSG_IN_STALL"), (20, "L2_SNP_MSG_IN"), (21, "L2_SNP_MSG_IN_STALL"),
    (22, "L2_RD_MSG_OUT"), (23, "L2_RD_MSG_OUT_STALL"), (24, "L2_WR_MSG_OUT"),
    (25, "L2_ANY_LOOKUP"), (26, "L2_READ_LOOKUP"), (27, "L2_WRITE_LOOKUP"),
    (28, "L2_EXT_SNOOP_LOOKUP"), (29, "L2_EXT_READ"), (30, "L2_EXT_READ_NOSNP"),
    (31, "L2_EXT_READ_UNIQUE"), (32, "L2_EXT_READ_BEATS"), (33, "L2_EXT_AR_STALL"),
    (34, "L2_EXT_AR_CNT_Q1"), (35, "L2_EXT_AR_CNT_Q2"), (36, "L2_EXT_AR_CNT_Q3"),
    (37, "L2_EXT_RRESP_0_127"), (38, "L2_EXT_RRESP_128_191"), (39, "L2_EXT_RRESP_192_255"),
    (40, "L2_EXT_RRESP_256_319"), (41, "L2_EXT_RRESP_320_383"), (42, "L2_EXT_WRITE"),
    (43, "L2_EXT_WRITE_NOSNP_FULL"), (44, "L2_EXT_WRITE_NOSNP_PTL"),
    (45, "L2_EXT_WRITE_SNP_FULL"), (46, "L2_EXT_WRITE_SNP_PTL"), (47, "L2_EXT_WRITE_BEATS"),
    (48, "L2_EXT_W_STALL"), (49, "L2_EXT_AW_CNT_Q1"), (50, "L2_EXT_AW_CNT_Q2"),
    (51, "L2_EXT_AW_CNT_Q3"), (52, "L2_EXT_SNOOP"), (53, "L2_EXT_SNOOP_STALL"),
    (54, "L2_EXT_SNOOP_RESP_CLEAN"), (55, "L2_EXT_SNOOP_RESP_DATA"),
    (56, "L2_EXT_SNOOP_INTERNAL"),
];
