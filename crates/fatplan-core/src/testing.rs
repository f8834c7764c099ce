// Switches 0 and 1 are linked; switch 0 owns hosts 0 and 1, switch 1 owns host 2.
pub(crate) const TWO_SWITCH: &str = "0 1
0->0
1->0
2->1
";

// 2 spines (IDs 0 and 1) and 3 leaves (IDs 2-4), each leaf with 2 hosts. Links are listed in
// both directions.
pub(crate) const LEAF_SPINE: &str = "0 2
0 3
0 4
1 2
1 3
1 4
2 0
2 1
3 0
3 1
4 0
4 1
0->2
1->2
2->3
3->3
4->4
5->4
";

// Switch IDs past 255 exercise the upper octet.
pub(crate) const WIDE_IDS: &str = "0 300
300 0
256 0
0 256
0->0
1->300
2->300
3->256
";

pub(crate) const FLOW_LIST: &str = "0,2,80,1.5
1 2 1600 0.25
2,0,70,2.0
";

pub(crate) const MATRIX: &str = "0,100,0
5,0,200
1000,0,0
";
